use std::{fs, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use retouch::{Editor, Point, Size, SurfaceConfig, Tool, Vec2};

#[derive(Parser, Debug)]
#[command(name = "retouch", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load an image, run an edit script against it, export the result.
    Apply(ApplyArgs),
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input image (any format the decoder understands).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Edit script JSON (a list of operations). Omit to re-export as-is.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long, default_value = retouch::DEFAULT_EXPORT_FILENAME)]
    out: PathBuf,

    /// Virtual container the display surface is fitted into, as WIDTHxHEIGHT.
    #[arg(long, default_value = "1320x1040", value_parser = parse_container)]
    container: Size,
}

/// One scripted edit. Gesture-based operations (blur, crop, logo moves) are
/// delivered to the engine as the pointer events a user would produce.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum EditOp {
    Strength { value: u32 },
    Blur { x: f64, y: f64, width: f64, height: f64 },
    Crop { x: f64, y: f64, width: f64, height: f64 },
    Logo { path: PathBuf },
    MoveLogo { dx: f64, dy: f64 },
    ResizeLogo { width: f64 },
    Undo,
    Reset,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
    }
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let image_bytes =
        fs::read(&args.in_path).with_context(|| format!("read image '{}'", args.in_path.display()))?;

    let mut editor = Editor::new(SurfaceConfig::new(args.container));
    editor.open(image_bytes);
    editor
        .pump()
        .with_context(|| format!("load image '{}'", args.in_path.display()))?;

    if let Some(script_path) = &args.script {
        let script = fs::read(script_path)
            .with_context(|| format!("read script '{}'", script_path.display()))?;
        let ops: Vec<EditOp> =
            serde_json::from_slice(&script).with_context(|| "parse edit script JSON")?;
        for (idx, op) in ops.into_iter().enumerate() {
            run_op(&mut editor, op).with_context(|| format!("edit script step {}", idx + 1))?;
        }
    }

    let png = editor.export_png()?;
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
    }
    fs::write(&args.out, png).with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn run_op(editor: &mut Editor, op: EditOp) -> anyhow::Result<()> {
    match op {
        EditOp::Strength { value } => {
            editor.set_blur_strength(value);
        }
        EditOp::Blur {
            x,
            y,
            width,
            height,
        } => {
            ensure_tool(editor, Tool::Blur)?;
            drag(editor, Point::new(x, y), Point::new(x + width, y + height))?;
        }
        EditOp::Crop {
            x,
            y,
            width,
            height,
        } => {
            ensure_tool(editor, Tool::Crop)?;
            drag(editor, Point::new(x, y), Point::new(x + width, y + height))?;
        }
        EditOp::Logo { path } => {
            ensure_tool(editor, Tool::Logo)?;
            let bytes =
                fs::read(&path).with_context(|| format!("read logo '{}'", path.display()))?;
            editor.upload_logo(bytes)?;
            editor.pump()?;
        }
        EditOp::MoveLogo { dx, dy } => {
            ensure_tool(editor, Tool::Logo)?;
            // Drag from the center of the target logo; the pointer-down
            // selects whichever logo is topmost there, like a real click.
            let rect = editor
                .selected_logo()
                .or_else(|| editor.logos().last())
                .map(|logo| logo.rect)
                .context("move-logo: no logo overlay exists")?;
            let from = Point::new((rect.x0 + rect.x1) / 2.0, (rect.y0 + rect.y1) / 2.0);
            drag(editor, from, from + Vec2::new(dx, dy))?;
        }
        EditOp::ResizeLogo { width } => {
            ensure_tool(editor, Tool::Logo)?;
            if editor.selected_logo().is_none() {
                // Click the most recent logo to select it first.
                let rect = editor
                    .logos()
                    .last()
                    .map(|logo| logo.rect)
                    .context("resize-logo: no logo overlay exists")?;
                let center = Point::new((rect.x0 + rect.x1) / 2.0, (rect.y0 + rect.y1) / 2.0);
                drag(editor, center, center)?;
            }
            let (handle, x0) = editor
                .selected_logo()
                .map(|logo| (logo.resize_handle_rect(), logo.rect.x0))
                .context("resize-logo: no logo is selected")?;
            let from = Point::new((handle.x0 + handle.x1) / 2.0, (handle.y0 + handle.y1) / 2.0);
            let to = Point::new(x0 + width, from.y);
            drag(editor, from, to)?;
        }
        EditOp::Undo => {
            editor.undo()?;
            editor.pump()?;
        }
        EditOp::Reset => {
            editor.reset()?;
        }
    }
    Ok(())
}

fn ensure_tool(editor: &mut Editor, tool: Tool) -> anyhow::Result<()> {
    if editor.tool() != Some(tool) {
        editor.select_tool(tool)?;
    }
    Ok(())
}

fn drag(editor: &mut Editor, from: Point, to: Point) -> anyhow::Result<()> {
    editor.pointer_down(from)?;
    editor.pointer_move(to)?;
    editor.pointer_up(to)?;
    editor.pump()?;
    Ok(())
}

fn parse_container(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width: f64 = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err("container dimensions must be > 0".to_string());
    }
    Ok(Size::new(width, height))
}

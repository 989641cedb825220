use std::sync::Arc;

use crate::{
    assets::{ImageRef, decode_image, encode_png},
    composite,
    controller::{CursorHint, DragState, Effect, ToolController},
    error::{RetouchError, RetouchResult},
    geom::{Mapper, PixelRect, Point, Rect, Size, fit_display_size, rect_from_corners},
    history::History,
    model::{
        BLUR_STRENGTH_DEFAULT, BLUR_STRENGTH_MAX, BLUR_STRENGTH_MIN, BlurRegion, CROP_MIN_SIZE,
        LogoOverlay, LogoSnapshot, Snapshot, Tool,
    },
    overlay::OverlayStack,
    pixmap::Pixmap,
};

/// Rendering geometry injected by the driver. The display surface is fitted
/// into `container` minus `padding` on each side; the container is fixed for
/// the engine's lifetime.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceConfig {
    pub container: Size,
    pub padding: f64,
}

impl SurfaceConfig {
    pub fn new(container: Size) -> Self {
        Self {
            container,
            padding: crate::model::SURFACE_PADDING,
        }
    }
}

/// Identifier of one pending decode. The generation ties the ticket to the
/// operation wave that issued it; resolutions from superseded generations
/// are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    id: u64,
    generation: u64,
}

/// A decode the driver must perform: decode `source` and hand the result
/// back through [`Editor::resolve_decode`]. [`Editor::pump`] does this
/// synchronously with the built-in decoder.
#[derive(Clone, Debug)]
pub struct DecodeJob {
    pub ticket: Ticket,
    pub source: ImageRef,
}

#[derive(Debug)]
enum Purpose {
    Open { source: ImageRef },
    CropResult { source: ImageRef },
    LogoUpload { source: ImageRef },
    RestoreImage,
    RestoreLogo { slot: usize },
}

/// In-flight undo restore: decoded pieces accumulate here and are applied
/// in one step only when every decode has succeeded.
struct RestoreTx {
    snapshot: Snapshot,
    base: Option<Pixmap>,
    logos: Vec<Option<Pixmap>>,
    outstanding: usize,
}

/// Everything that exists only while an image is loaded.
struct Loaded {
    original: Pixmap,
    original_ref: ImageRef,
    current: Pixmap,
    current_ref: ImageRef,
    buffer: Pixmap,
    display: Pixmap,
    preview: Pixmap,
}

/// The editing engine: interprets pointer gestures into image mutations,
/// composites blur regions and logo overlays over a full-resolution buffer,
/// and keeps a bounded undo history of serialized snapshots.
///
/// Single-threaded and event-driven. All decodes go through the job queue;
/// operations that replace whole editor state (open, crop, undo, reset)
/// bump the generation counter, which invalidates every decode still in
/// flight from before. Logo uploads only append state and do not supersede.
pub struct Editor {
    config: SurfaceConfig,
    visible: bool,
    loaded: Option<Loaded>,
    overlays: OverlayStack,
    history: History,
    controller: ToolController,
    tool: Option<Tool>,
    strength: u32,
    cursor: CursorHint,
    generation: u64,
    next_ticket_id: u64,
    queue: Vec<DecodeJob>,
    in_flight: Vec<(Ticket, Purpose)>,
    restore: Option<RestoreTx>,
}

impl Editor {
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            config,
            visible: false,
            loaded: None,
            overlays: OverlayStack::new(),
            history: History::new(),
            controller: ToolController::new(),
            tool: None,
            strength: BLUR_STRENGTH_DEFAULT,
            cursor: CursorHint::Default,
            generation: 0,
            next_ticket_id: 0,
            queue: Vec::new(),
            in_flight: Vec::new(),
            restore: None,
        }
    }

    // --- driver-facing state ---

    pub fn is_open(&self) -> bool {
        self.visible && self.loaded.is_some()
    }

    pub fn tool(&self) -> Option<Tool> {
        self.tool
    }

    pub fn cursor(&self) -> CursorHint {
        self.cursor
    }

    pub fn blur_strength(&self) -> u32 {
        self.strength
    }

    pub fn undo_available(&self) -> bool {
        self.history.undo_available()
    }

    pub fn display(&self) -> Option<&Pixmap> {
        self.loaded.as_ref().map(|l| &l.display)
    }

    pub fn preview(&self) -> Option<&Pixmap> {
        self.loaded.as_ref().map(|l| &l.preview)
    }

    pub fn current(&self) -> Option<&Pixmap> {
        self.loaded.as_ref().map(|l| &l.current)
    }

    pub fn blur_regions(&self) -> &[BlurRegion] {
        self.overlays.blur_regions()
    }

    pub fn logos(&self) -> &[LogoOverlay] {
        self.overlays.logos()
    }

    pub fn selected_logo(&self) -> Option<&LogoOverlay> {
        self.overlays.selected()
    }

    // --- lifecycle ---

    /// Begin loading an image. Supersedes every in-flight decode; the
    /// editor shows (and resets tool/history state) only once the decode
    /// resolves successfully.
    pub fn open(&mut self, bytes: Vec<u8>) -> Ticket {
        self.supersede();
        let source = ImageRef::new(bytes);
        let ticket = self.enqueue(source.clone(), Purpose::Open { source });
        tracing::debug!(?ticket, "open scheduled");
        ticket
    }

    /// Hide the editor. Engine state is kept; the next `open` resets it.
    pub fn close(&mut self) {
        self.visible = false;
    }

    /// Export the current full-resolution composite (overlays baked in) as
    /// PNG bytes. The suggested filename is
    /// [`crate::model::DEFAULT_EXPORT_FILENAME`].
    pub fn export_png(&self) -> RetouchResult<Vec<u8>> {
        let loaded = self.require_loaded()?;
        encode_png(&loaded.buffer)
    }

    // --- tool configuration ---

    /// Select a tool; selecting the active tool again deselects it. Any
    /// drag in progress is aborted and the logo selection cleared.
    pub fn select_tool(&mut self, tool: Tool) -> RetouchResult<()> {
        self.tool = if self.tool == Some(tool) { None } else { Some(tool) };
        self.controller.cancel();
        self.overlays.select(None);
        self.cursor = match self.tool {
            Some(Tool::Crop) => CursorHint::Crosshair,
            _ => CursorHint::Default,
        };
        self.redraw()
    }

    /// Clamped to [2, 30]; read at blur-region creation time only.
    pub fn set_blur_strength(&mut self, strength: u32) {
        self.strength = strength.clamp(BLUR_STRENGTH_MIN, BLUR_STRENGTH_MAX);
    }

    /// Schedule a logo upload. Does not supersede other decodes: uploads
    /// only append state, so several may be in flight at once.
    pub fn upload_logo(&mut self, bytes: Vec<u8>) -> RetouchResult<Ticket> {
        self.require_loaded()?;
        let source = ImageRef::new(bytes);
        let ticket = self.enqueue(source.clone(), Purpose::LogoUpload { source });
        Ok(ticket)
    }

    // --- input events ---

    /// Drags start only on the surface itself; moves and releases are
    /// tracked wherever the pointer goes afterwards.
    pub fn pointer_down(&mut self, point: Point) -> RetouchResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let display = self.require_loaded()?.display.size();
        if point.x < 0.0 || point.y < 0.0 || point.x > display.width || point.y > display.height {
            return Ok(());
        }
        let effects = self.controller.pointer_down(self.tool, point, &self.overlays);
        self.apply_effects(effects)
    }

    pub fn pointer_move(&mut self, point: Point) -> RetouchResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let (effects, hint) = self.controller.pointer_move(self.tool, point, &self.overlays);
        if let Some(hint) = hint {
            self.cursor = hint;
        }
        self.apply_effects(effects)
    }

    pub fn pointer_up(&mut self, point: Point) -> RetouchResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let effects = self.controller.pointer_up(point);
        self.apply_effects(effects)
    }

    /// Platform-conventional undo shortcut: modifier + 'z'.
    pub fn key_down(&mut self, key: char, ctrl_or_cmd: bool) -> RetouchResult<()> {
        if ctrl_or_cmd && key.eq_ignore_ascii_case(&'z') {
            self.undo()?;
        }
        Ok(())
    }

    // --- history ---

    /// Schedule an undo. No-op when nothing can be undone. The restore is
    /// all-or-nothing: state changes only once every snapshot image has
    /// decoded, and a failed or superseded restore leaves the editor (and
    /// the history index) untouched.
    pub fn undo(&mut self) -> RetouchResult<()> {
        self.require_loaded()?;
        let Some(snapshot) = self.history.peek_previous().cloned() else {
            return Ok(());
        };
        self.supersede();

        let logo_count = snapshot.logos.len();
        let image_ticket = self.enqueue(snapshot.image.clone(), Purpose::RestoreImage);
        for (slot, logo) in snapshot.logos.iter().enumerate() {
            self.enqueue(logo.source.clone(), Purpose::RestoreLogo { slot });
        }
        self.restore = Some(RestoreTx {
            snapshot,
            base: None,
            logos: vec![None; logo_count],
            outstanding: logo_count + 1,
        });
        tracing::debug!(?image_ticket, logo_count, "undo restore scheduled");
        Ok(())
    }

    /// Discard all edits: restore the originally loaded image, clear the
    /// overlays, and capture a snapshot of the restored state.
    pub fn reset(&mut self) -> RetouchResult<()> {
        let (original, original_ref) = {
            let loaded = self.require_loaded()?;
            (loaded.original.clone(), loaded.original_ref.clone())
        };
        self.supersede();
        self.install_current(original, original_ref)?;
        self.capture();
        Ok(())
    }

    // --- decode plumbing ---

    /// Drain the decode jobs the driver must perform.
    pub fn take_decode_jobs(&mut self) -> Vec<DecodeJob> {
        std::mem::take(&mut self.queue)
    }

    /// Hand a finished decode back to the engine. Resolutions carrying a
    /// superseded generation are dropped silently; errors abort the
    /// operation that requested the decode and are returned to the caller.
    pub fn resolve_decode(
        &mut self,
        ticket: Ticket,
        result: RetouchResult<Pixmap>,
    ) -> RetouchResult<()> {
        if ticket.generation != self.generation {
            tracing::debug!(?ticket, "dropping stale decode resolution");
            return Ok(());
        }
        let Some(pos) = self.in_flight.iter().position(|(t, _)| *t == ticket) else {
            return Err(RetouchError::validation("unknown decode ticket"));
        };
        let (_, purpose) = self.in_flight.remove(pos);

        match purpose {
            Purpose::Open { source } => match result {
                Ok(pixmap) => self.finish_open(pixmap, source),
                Err(err) => {
                    self.visible = false;
                    self.loaded = None;
                    Err(err)
                }
            },
            Purpose::CropResult { source } => {
                let pixmap = result?;
                self.install_current(pixmap, source)?;
                self.capture();
                Ok(())
            }
            Purpose::LogoUpload { source } => {
                let pixmap = result?;
                let display_width = self
                    .loaded
                    .as_ref()
                    .map(|l| f64::from(l.display.width()))
                    .unwrap_or_default();
                self.overlays.add_logo(Arc::new(pixmap), source, display_width);
                self.redraw()?;
                self.capture();
                Ok(())
            }
            Purpose::RestoreImage => self.feed_restore(result, None),
            Purpose::RestoreLogo { slot } => self.feed_restore(result, Some(slot)),
        }
    }

    /// Synchronously service pending decode jobs with the built-in decoder
    /// until the queue is empty.
    pub fn pump(&mut self) -> RetouchResult<()> {
        loop {
            let jobs = self.take_decode_jobs();
            if jobs.is_empty() {
                return Ok(());
            }
            for job in jobs {
                let result = decode_image(job.source.bytes());
                self.resolve_decode(job.ticket, result)?;
            }
        }
    }

    // --- internals ---

    fn require_loaded(&self) -> RetouchResult<&Loaded> {
        self.loaded
            .as_ref()
            .ok_or_else(|| RetouchError::validation("no image is loaded"))
    }

    /// Invalidate every in-flight decode; the next wave of tickets belongs
    /// to a new generation.
    fn supersede(&mut self) {
        self.generation += 1;
        self.queue.clear();
        self.in_flight.clear();
        self.restore = None;
    }

    fn enqueue(&mut self, source: ImageRef, purpose: Purpose) -> Ticket {
        let ticket = Ticket {
            id: self.next_ticket_id,
            generation: self.generation,
        };
        self.next_ticket_id += 1;
        self.in_flight.push((ticket, purpose));
        self.queue.push(DecodeJob { ticket, source });
        ticket
    }

    fn surfaces_for(&self, image: &Pixmap) -> RetouchResult<(Pixmap, Pixmap)> {
        let display_size =
            fit_display_size(image.size(), self.config.container, self.config.padding)?;
        let display = Pixmap::new(
            (display_size.width.floor() as u32).max(1),
            (display_size.height.floor() as u32).max(1),
        )?;
        let buffer = Pixmap::new(image.width(), image.height())?;
        Ok((display, buffer))
    }

    fn finish_open(&mut self, pixmap: Pixmap, source: ImageRef) -> RetouchResult<()> {
        let (display, buffer) = self.surfaces_for(&pixmap)?;
        self.loaded = Some(Loaded {
            original: pixmap.clone(),
            original_ref: source.clone(),
            current: pixmap,
            current_ref: source,
            buffer,
            display,
            preview: Pixmap::new(1, 1)?,
        });
        self.overlays.clear();
        self.controller.cancel();
        self.history.clear();
        self.tool = None;
        self.cursor = CursorHint::Default;
        self.visible = true;
        self.redraw()?;
        self.capture();
        tracing::debug!("image loaded, editor open");
        Ok(())
    }

    /// Replace `current` (crop result, reset, restore): new surfaces sized
    /// to the new image, overlays discarded, drag aborted, composite
    /// rebuilt.
    fn install_current(&mut self, pixmap: Pixmap, source: ImageRef) -> RetouchResult<()> {
        let (display, buffer) = self.surfaces_for(&pixmap)?;
        let loaded = self
            .loaded
            .as_mut()
            .ok_or_else(|| RetouchError::validation("no image is loaded"))?;
        loaded.current = pixmap;
        loaded.current_ref = source;
        loaded.buffer = buffer;
        loaded.display = display;
        self.overlays.clear();
        self.controller.cancel();
        self.redraw()
    }

    fn redraw(&mut self) -> RetouchResult<()> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Ok(());
        };
        let mapper = Mapper::new(loaded.buffer.size(), loaded.display.size())?;
        composite::rebuild_buffer(&mut loaded.buffer, &loaded.current, &self.overlays, &mapper)?;
        composite::present(&mut loaded.display, &loaded.buffer)?;

        if self.tool == Some(Tool::Logo) {
            if let Some(logo) = self.overlays.selected() {
                composite::draw_logo_selection(
                    &mut loaded.display,
                    logo.rect,
                    logo.resize_handle_rect(),
                )?;
            }
        }
        match self.controller.drag_state() {
            DragState::CropDragging { start, current } => {
                composite::draw_crop_preview(&mut loaded.display, rect_from_corners(start, current))?;
            }
            DragState::BlurDragging { start, current } => {
                composite::draw_blur_preview(&mut loaded.display, rect_from_corners(start, current))?;
            }
            _ => {}
        }

        loaded.preview = composite::render_preview(&loaded.buffer)?;
        Ok(())
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> RetouchResult<()> {
        for effect in effects {
            match effect {
                Effect::SelectLogo(index) => self.overlays.select(Some(index)),
                Effect::ClearSelection => self.overlays.select(None),
                Effect::MoveSelected(delta) => {
                    let display = self
                        .loaded
                        .as_ref()
                        .map(|l| l.display.size())
                        .unwrap_or_default();
                    self.overlays.move_selected(delta, display);
                }
                Effect::ResizeSelected(pointer) => {
                    let width = self
                        .loaded
                        .as_ref()
                        .map(|l| f64::from(l.display.width()))
                        .unwrap_or_default();
                    self.overlays.resize_selected(pointer, width);
                }
                Effect::CommitCrop(rect) => self.commit_crop(rect)?,
                Effect::CommitBlur(rect) => self.commit_blur(rect)?,
                Effect::CommitLogoGesture => self.capture(),
                Effect::Redraw => self.redraw()?,
            }
        }
        Ok(())
    }

    fn commit_crop(&mut self, rect: Rect) -> RetouchResult<()> {
        if rect.width() < CROP_MIN_SIZE || rect.height() < CROP_MIN_SIZE {
            return self.redraw();
        }
        let region = {
            let loaded = self.require_loaded()?;
            let mapper = Mapper::new(loaded.buffer.size(), loaded.display.size())?;
            PixelRect::clamp_from(
                mapper.to_buffer(rect),
                loaded.buffer.width(),
                loaded.buffer.height(),
            )
        };
        let Some(region) = region else {
            return self.redraw();
        };

        // The buffer holds the up-to-date composite, so the crop carries
        // blur regions and logos baked in. The extraction round-trips
        // through an encode + decode to become a standalone image.
        let cropped = self.require_loaded()?.buffer.extract(region)?;
        let source = ImageRef::new(encode_png(&cropped)?);
        self.supersede();
        let ticket = self.enqueue(source.clone(), Purpose::CropResult { source });
        tracing::debug!(
            ?ticket,
            width = region.width,
            height = region.height,
            "crop scheduled"
        );
        self.redraw()
    }

    fn commit_blur(&mut self, rect: Rect) -> RetouchResult<()> {
        if self.overlays.add_blur(rect, self.strength) {
            self.redraw()?;
            self.capture();
            tracing::debug!(strength = self.strength, "blur region added");
        } else {
            self.redraw()?;
        }
        Ok(())
    }

    fn capture(&mut self) {
        // A new commit supersedes any undo restore still waiting on its
        // decodes; letting it land afterwards would clobber this edit.
        if self.restore.is_some() {
            self.supersede();
        }
        let Some(loaded) = self.loaded.as_ref() else {
            return;
        };
        let snapshot = Snapshot {
            image: loaded.current_ref.clone(),
            blur_regions: self.overlays.blur_regions().to_vec(),
            logos: self
                .overlays
                .logos()
                .iter()
                .map(|logo| LogoSnapshot {
                    source: logo.source.clone(),
                    rect: logo.rect,
                    aspect_ratio: logo.aspect_ratio,
                })
                .collect(),
        };
        self.history.capture(snapshot);
        tracing::debug!(len = self.history.len(), "snapshot captured");
    }

    fn feed_restore(
        &mut self,
        result: RetouchResult<Pixmap>,
        slot: Option<usize>,
    ) -> RetouchResult<()> {
        let pixmap = match result {
            Ok(pixmap) => pixmap,
            Err(err) => {
                // All-or-nothing: abandon the whole restore, keep state.
                self.restore = None;
                return Err(err);
            }
        };
        let Some(tx) = self.restore.as_mut() else {
            return Ok(());
        };
        match slot {
            None => tx.base = Some(pixmap),
            Some(slot) => tx.logos[slot] = Some(pixmap),
        }
        tx.outstanding -= 1;
        if tx.outstanding == 0 {
            self.apply_restore()?;
        }
        Ok(())
    }

    fn apply_restore(&mut self) -> RetouchResult<()> {
        let Some(tx) = self.restore.take() else {
            return Ok(());
        };
        let base = tx
            .base
            .ok_or_else(|| RetouchError::validation("restore finished without its base image"))?;

        let logos = tx
            .snapshot
            .logos
            .iter()
            .zip(tx.logos)
            .map(|(snap, pixmap)| {
                let pixmap = pixmap.ok_or_else(|| {
                    RetouchError::validation("restore finished with a missing logo image")
                })?;
                Ok(LogoOverlay {
                    image: Arc::new(pixmap),
                    source: snap.source.clone(),
                    rect: snap.rect,
                    aspect_ratio: snap.aspect_ratio,
                })
            })
            .collect::<RetouchResult<Vec<_>>>()?;

        self.install_current(base, tx.snapshot.image.clone())?;
        self.overlays.replace(tx.snapshot.blur_regions, logos);
        self.redraw()?;
        self.history.commit_undo();
        tracing::debug!(index = self.history.index(), "undo restore applied");
        Ok(())
    }
}

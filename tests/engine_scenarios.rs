//! End-to-end gesture scenarios driven through the public `Editor` API,
//! with decodes serviced by `pump`.

use retouch::{CursorHint, Editor, Point, Size, SurfaceConfig, Tool};

fn trace_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        let v = ((x * 7 + y * 13) as u8).wrapping_add(seed);
        image::Rgba([v, v.wrapping_mul(3), v.wrapping_add(40), 255])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn open_editor(container: Size, image: Vec<u8>) -> Editor {
    let mut editor = Editor::new(SurfaceConfig::new(container));
    editor.open(image);
    editor.pump().unwrap();
    assert!(editor.is_open());
    editor
}

fn drag(editor: &mut Editor, from: Point, to: Point) {
    editor.pointer_down(from).unwrap();
    editor.pointer_move(to).unwrap();
    editor.pointer_up(to).unwrap();
    editor.pump().unwrap();
}

#[test]
fn crop_on_half_scale_display_doubles_back_to_buffer_space() {
    trace_init();
    // 1000x800 image fitted into a 540x440 container (20 padding per side)
    // yields a 500x400 display surface: exactly half scale.
    let mut editor = open_editor(Size::new(540.0, 440.0), png_bytes(1000, 800, 0));
    assert_eq!(editor.display().unwrap().width(), 500);
    assert_eq!(editor.display().unwrap().height(), 400);

    editor.select_tool(Tool::Crop).unwrap();
    drag(&mut editor, Point::new(100.0, 100.0), Point::new(500.0, 400.0));

    let current = editor.current().unwrap();
    assert_eq!(current.width(), 800);
    assert_eq!(current.height(), 600);
    // The crop replaced the image: overlays are gone and the display
    // surface was refitted to the new aspect ratio.
    assert!(editor.logos().is_empty());
    assert!(editor.blur_regions().is_empty());
    assert!(editor.undo_available());
}

#[test]
fn crop_result_is_clamped_to_buffer_bounds() {
    let mut editor = open_editor(Size::new(540.0, 440.0), png_bytes(1000, 800, 1));
    editor.select_tool(Tool::Crop).unwrap();
    // Drag past the bottom-right corner of the surface.
    drag(&mut editor, Point::new(400.0, 300.0), Point::new(900.0, 900.0));

    let current = editor.current().unwrap();
    assert_eq!(current.width(), 200);
    assert_eq!(current.height(), 200);
}

#[test]
fn blur_strength_is_fixed_at_region_creation() {
    trace_init();
    let mut editor = open_editor(Size::new(840.0, 640.0), png_bytes(800, 600, 2));
    editor.select_tool(Tool::Blur).unwrap();

    editor.set_blur_strength(15);
    drag(&mut editor, Point::new(100.0, 100.0), Point::new(150.0, 150.0));

    editor.set_blur_strength(5);
    drag(&mut editor, Point::new(300.0, 100.0), Point::new(350.0, 150.0));

    let strengths: Vec<u32> = editor.blur_regions().iter().map(|r| r.strength).collect();
    assert_eq!(strengths, vec![15, 5]);

    // Redraws re-apply the stored strengths: two consecutive exports of
    // unchanged state are identical.
    let first = editor.export_png().unwrap();
    editor.pointer_move(Point::new(10.0, 10.0)).unwrap();
    let second = editor.export_png().unwrap();
    assert_eq!(first, second);
}

#[test]
fn blurred_export_differs_from_plain_export_only_where_blurred() {
    let image = png_bytes(400, 400, 3);
    let mut editor = open_editor(Size::new(440.0, 440.0), image.clone());
    let before = editor.export_png().unwrap();

    editor.select_tool(Tool::Blur).unwrap();
    drag(&mut editor, Point::new(100.0, 100.0), Point::new(200.0, 200.0));
    let after = editor.export_png().unwrap();
    assert_ne!(before, after);

    let before_px = retouch::decode_image(&before).unwrap();
    let after_px = retouch::decode_image(&after).unwrap();
    // Far away from the blurred region nothing changed.
    assert_eq!(before_px.pixel(10, 10), after_px.pixel(10, 10));
    assert_eq!(before_px.pixel(390, 390), after_px.pixel(390, 390));
}

#[test]
fn five_uploads_stack_at_default_origin_each_selected_in_turn() {
    trace_init();
    let mut editor = open_editor(Size::new(840.0, 640.0), png_bytes(800, 600, 4));
    editor.select_tool(Tool::Logo).unwrap();

    for seed in 0..5u8 {
        editor.upload_logo(png_bytes(64, 32, seed)).unwrap();
        editor.pump().unwrap();
        // Each new upload becomes the selected overlay.
        let selected = editor.selected_logo().unwrap();
        assert_eq!(selected.rect.x0, 20.0);
        assert_eq!(selected.rect.y0, 20.0);
    }

    assert_eq!(editor.logos().len(), 5);
    for logo in editor.logos() {
        assert_eq!((logo.rect.x0, logo.rect.y0), (20.0, 20.0));
        assert_eq!(logo.rect.width(), 150.0);
        assert_eq!(logo.rect.height(), 75.0);
    }
}

#[test]
fn dragging_moves_the_topmost_overlapping_logo() {
    let mut editor = open_editor(Size::new(840.0, 640.0), png_bytes(800, 600, 5));
    editor.select_tool(Tool::Logo).unwrap();
    for seed in 0..2u8 {
        editor.upload_logo(png_bytes(64, 64, seed)).unwrap();
        editor.pump().unwrap();
    }

    // Both logos cover (20,20)..(170,170); the drag must grab the second.
    drag(&mut editor, Point::new(90.0, 90.0), Point::new(290.0, 90.0));
    let logos = editor.logos();
    assert_eq!(logos[0].rect.x0, 20.0);
    assert_eq!(logos[1].rect.x0, 220.0);
}

#[test]
fn logo_move_never_leaves_the_surface() {
    let mut editor = open_editor(Size::new(840.0, 640.0), png_bytes(800, 600, 6));
    editor.select_tool(Tool::Logo).unwrap();
    editor.upload_logo(png_bytes(64, 64, 0)).unwrap();
    editor.pump().unwrap();

    let display = editor.display().unwrap().size();
    drag(
        &mut editor,
        Point::new(90.0, 90.0),
        Point::new(-5000.0, 9000.0),
    );
    let rect = editor.logos()[0].rect;
    assert!(rect.x0 >= 0.0 && rect.y0 >= 0.0);
    assert!(rect.x1 <= display.width && rect.y1 <= display.height);
}

#[test]
fn resize_gesture_preserves_aspect_ratio_and_minimum_width() {
    let mut editor = open_editor(Size::new(840.0, 640.0), png_bytes(800, 600, 7));
    editor.select_tool(Tool::Logo).unwrap();
    editor.upload_logo(png_bytes(100, 50, 0)).unwrap();
    editor.pump().unwrap();

    // Logo: (20,20)..(170,95), handle centered on (170,95).
    drag(&mut editor, Point::new(170.0, 95.0), Point::new(320.0, 95.0));
    let logo = &editor.logos()[0];
    assert_eq!(logo.rect.width(), 300.0);
    assert!((logo.rect.height() - 150.0).abs() < 1e-9);

    // Shrinking below the minimum clamps at width 20.
    drag(&mut editor, Point::new(320.0, 170.0), Point::new(0.0, 0.0));
    let logo = &editor.logos()[0];
    assert_eq!(logo.rect.width(), 20.0);
    assert!((logo.rect.height() - 10.0).abs() < 1e-9);
}

#[test]
fn hover_cursor_tracks_tool_and_overlay_geometry() {
    let mut editor = open_editor(Size::new(840.0, 640.0), png_bytes(800, 600, 8));

    editor.select_tool(Tool::Crop).unwrap();
    assert_eq!(editor.cursor(), CursorHint::Crosshair);

    editor.select_tool(Tool::Logo).unwrap();
    editor.upload_logo(png_bytes(64, 64, 0)).unwrap();
    editor.pump().unwrap();

    editor.pointer_move(Point::new(90.0, 90.0)).unwrap();
    assert_eq!(editor.cursor(), CursorHint::Move);

    // Over the selected logo's handle (centered on its bottom-right corner).
    editor.pointer_move(Point::new(170.0, 170.0)).unwrap();
    assert_eq!(editor.cursor(), CursorHint::SeResize);

    editor.pointer_move(Point::new(700.0, 20.0)).unwrap();
    assert_eq!(editor.cursor(), CursorHint::Default);
}

#[test]
fn preview_follows_the_current_buffer_aspect() {
    let mut editor = open_editor(Size::new(540.0, 440.0), png_bytes(1000, 800, 9));
    let preview = editor.preview().unwrap();
    assert_eq!(preview.width(), 250);
    assert_eq!(preview.height(), 200);

    editor.select_tool(Tool::Crop).unwrap();
    drag(&mut editor, Point::new(0.0, 0.0), Point::new(400.0, 100.0));
    // New buffer is 800x200; the preview keeps its fixed width.
    let preview = editor.preview().unwrap();
    assert_eq!(preview.width(), 250);
    assert_eq!(preview.height(), 63);
}

#[test]
fn export_bakes_logo_pixels_into_the_output() {
    let mut editor = open_editor(Size::new(440.0, 440.0), png_bytes(400, 400, 10));
    let before = retouch::decode_image(&editor.export_png().unwrap()).unwrap();

    editor.select_tool(Tool::Logo).unwrap();
    // Solid white logo so the composite provably changes.
    let logo = {
        let img = image::RgbaImage::from_pixel(50, 50, image::Rgba([255, 255, 255, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    };
    editor.upload_logo(logo).unwrap();
    editor.pump().unwrap();

    let after = retouch::decode_image(&editor.export_png().unwrap()).unwrap();
    // Logo occupies (20,20)..(120,120) in display-space == buffer-space
    // here (400x400 into a 400x400 display).
    assert_eq!(after.pixel(70, 70), [255, 255, 255, 255]);
    assert_ne!(before.pixel(70, 70), after.pixel(70, 70));
    assert_eq!(before.pixel(300, 300), after.pixel(300, 300));
}

use crate::{
    blur::blur_region,
    error::RetouchResult,
    geom::{Mapper, PixelRect, Rect},
    model::{ACCENT_RGB, PREVIEW_WIDTH},
    overlay::OverlayStack,
    pixmap::{Pixmap, premul_rgba8},
};

/// Rebuild the full-resolution edit buffer: the current image, then every
/// blur region and logo overlay in insertion order, mapped from display- to
/// buffer-space. The current image pixels are never mutated; blur is
/// re-applied from scratch on every rebuild.
#[tracing::instrument(skip_all)]
pub fn rebuild_buffer(
    buffer: &mut Pixmap,
    current: &Pixmap,
    overlays: &OverlayStack,
    mapper: &Mapper,
) -> RetouchResult<()> {
    buffer.copy_from(current)?;

    for region in overlays.blur_regions() {
        let mapped = mapper.to_buffer(region.rect);
        if let Some(rect) = PixelRect::clamp_from(mapped, buffer.width(), buffer.height()) {
            blur_region(buffer, rect, region.strength)?;
        }
    }

    for logo in overlays.logos() {
        let mapped = mapper.to_buffer(logo.rect);
        if let Some(rect) = PixelRect::clamp_from(mapped, buffer.width(), buffer.height()) {
            buffer.draw_scaled_over(&logo.image, rect)?;
        }
    }

    Ok(())
}

/// Blit the edit buffer scaled into the display surface.
pub fn present(display: &mut Pixmap, buffer: &Pixmap) -> RetouchResult<()> {
    display.clear();
    let full = PixelRect {
        x: 0,
        y: 0,
        width: display.width(),
        height: display.height(),
    };
    display.draw_scaled_over(buffer, full)
}

/// Fixed-width thumbnail of the edit buffer, preserving its aspect ratio.
pub fn render_preview(buffer: &Pixmap) -> RetouchResult<Pixmap> {
    let height = ((f64::from(PREVIEW_WIDTH) * f64::from(buffer.height())
        / f64::from(buffer.width()))
    .round() as u32)
        .max(1);
    let mut preview = Pixmap::new(PREVIEW_WIDTH, height)?;
    let full = PixelRect {
        x: 0,
        y: 0,
        width: PREVIEW_WIDTH,
        height,
    };
    preview.draw_scaled_over(buffer, full)?;
    Ok(preview)
}

/// Selection chrome for the selected logo: an accent stroke around its
/// rectangle and a filled square at the resize handle. Display-space only,
/// drawn after `present`, never persisted.
pub fn draw_logo_selection(
    display: &mut Pixmap,
    logo_rect: Rect,
    handle_rect: Rect,
) -> RetouchResult<()> {
    let accent = premul_rgba8(ACCENT_RGB[0], ACCENT_RGB[1], ACCENT_RGB[2], 1.0);
    if let Some(rect) = clamp_to_display(display, logo_rect) {
        display.stroke_rect_over(rect, 2, accent)?;
    }
    if let Some(rect) = clamp_to_display(display, handle_rect) {
        display.fill_rect_over(rect, accent)?;
    }
    Ok(())
}

/// Translucent drag preview for an uncommitted blur region.
pub fn draw_blur_preview(display: &mut Pixmap, rect: Rect) -> RetouchResult<()> {
    let Some(region) = clamp_to_display(display, rect) else {
        return Ok(());
    };
    let fill = premul_rgba8(ACCENT_RGB[0], ACCENT_RGB[1], ACCENT_RGB[2], 0.3);
    let stroke = premul_rgba8(ACCENT_RGB[0], ACCENT_RGB[1], ACCENT_RGB[2], 0.8);
    display.fill_rect_over(region, fill)?;
    display.stroke_rect_over(region, 1, stroke)
}

/// Crop drag chrome: dim everything outside the rectangle and stroke its
/// border in white.
pub fn draw_crop_preview(display: &mut Pixmap, rect: Rect) -> RetouchResult<()> {
    let Some(region) = clamp_to_display(display, rect) else {
        return Ok(());
    };
    let dim = premul_rgba8(0, 0, 0, 0.5);
    let (w, h) = (display.width(), display.height());

    let bands = [
        PixelRect {
            x: 0,
            y: 0,
            width: w,
            height: region.y,
        },
        PixelRect {
            x: 0,
            y: region.y + region.height,
            width: w,
            height: h - region.y - region.height,
        },
        PixelRect {
            x: 0,
            y: region.y,
            width: region.x,
            height: region.height,
        },
        PixelRect {
            x: region.x + region.width,
            y: region.y,
            width: w - region.x - region.width,
            height: region.height,
        },
    ];
    for band in bands {
        if band.width > 0 && band.height > 0 {
            display.fill_rect_over(band, dim)?;
        }
    }

    display.stroke_rect_over(region, 1, [255, 255, 255, 255])
}

fn clamp_to_display(display: &Pixmap, rect: Rect) -> Option<PixelRect> {
    let bounded = Rect::new(
        rect.x0.max(0.0),
        rect.y0.max(0.0),
        rect.x1.min(f64::from(display.width())),
        rect.y1.min(f64::from(display.height())),
    );
    if bounded.width() <= 0.0 || bounded.height() <= 0.0 {
        return None;
    }
    PixelRect::clamp_from(bounded, display.width(), display.height())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{assets::ImageRef, geom::Size};

    fn solid(width: u32, height: u32, px: [u8; 4]) -> Pixmap {
        Pixmap::from_raw(width, height, px.repeat((width * height) as usize)).unwrap()
    }

    fn identity_mapper(size: Size) -> Mapper {
        Mapper::new(size, size).unwrap()
    }

    #[test]
    fn rebuild_without_overlays_copies_current() {
        let current = solid(8, 8, [10, 20, 30, 255]);
        let mut buffer = Pixmap::new(8, 8).unwrap();
        let overlays = OverlayStack::new();
        rebuild_buffer(
            &mut buffer,
            &current,
            &overlays,
            &identity_mapper(current.size()),
        )
        .unwrap();
        assert_eq!(buffer, current);
    }

    #[test]
    fn rebuild_blurs_only_the_region() {
        // Checkerboard-ish content so blur actually changes pixels.
        let mut current = solid(16, 16, [0, 0, 0, 255]);
        for y in 0..16u32 {
            for x in 0..16u32 {
                if (x + y) % 2 == 0 {
                    let idx = ((y * 16 + x) * 4) as usize;
                    current.data_mut()[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
                }
            }
        }
        let mut buffer = Pixmap::new(16, 16).unwrap();
        let mut overlays = OverlayStack::new();
        assert!(overlays.add_blur(Rect::new(4.0, 4.0, 12.0, 12.0), 5));

        rebuild_buffer(
            &mut buffer,
            &current,
            &overlays,
            &identity_mapper(current.size()),
        )
        .unwrap();

        assert_ne!(buffer.pixel(8, 8), current.pixel(8, 8));
        assert_eq!(buffer.pixel(0, 0), current.pixel(0, 0));
        assert_eq!(buffer.pixel(15, 15), current.pixel(15, 15));
    }

    #[test]
    fn rebuild_draws_logo_scaled_into_buffer_space() {
        let current = solid(20, 20, [0, 0, 0, 255]);
        let mut buffer = Pixmap::new(20, 20).unwrap();
        let mut overlays = OverlayStack::new();
        overlays.add_logo(
            Arc::new(solid(4, 4, [255, 0, 0, 255])),
            ImageRef::new(vec![0]),
            40.0,
        );
        // Logo lands at (20,20)..(30,30) in display-space; mapper scales by
        // 0.5 into a 20x20 buffer -> (10,10)..(15,15).
        let mapper = Mapper::new(Size::new(20.0, 20.0), Size::new(40.0, 40.0)).unwrap();
        rebuild_buffer(&mut buffer, &current, &overlays, &mapper).unwrap();

        assert_eq!(buffer.pixel(12, 12), [255, 0, 0, 255]);
        assert_eq!(buffer.pixel(5, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn present_scales_buffer_to_display() {
        let buffer = solid(10, 10, [7, 14, 21, 255]);
        let mut display = Pixmap::new(5, 5).unwrap();
        present(&mut display, &buffer).unwrap();
        assert_eq!(display.pixel(0, 0), [7, 14, 21, 255]);
        assert_eq!(display.pixel(4, 4), [7, 14, 21, 255]);
    }

    #[test]
    fn preview_preserves_buffer_aspect() {
        let buffer = solid(1000, 800, [1, 2, 3, 255]);
        let preview = render_preview(&buffer).unwrap();
        assert_eq!(preview.width(), PREVIEW_WIDTH);
        assert_eq!(preview.height(), 200);
    }

    #[test]
    fn crop_preview_dims_outside_and_keeps_inside() {
        let mut display = solid(20, 20, [100, 100, 100, 255]);
        draw_crop_preview(&mut display, Rect::new(5.0, 5.0, 15.0, 15.0)).unwrap();
        // Outside is darkened, interior pixels are untouched.
        assert!(display.pixel(0, 0)[0] < 100);
        assert_eq!(display.pixel(10, 10), [100, 100, 100, 255]);
        // Border stroke is white.
        assert_eq!(display.pixel(5, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn blur_preview_tints_the_region() {
        let mut display = solid(20, 20, [0, 0, 0, 255]);
        draw_blur_preview(&mut display, Rect::new(2.0, 2.0, 18.0, 18.0)).unwrap();
        let inner = display.pixel(10, 10);
        assert!(inner[2] > 0); // blue-ish accent over black
        assert_eq!(display.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn selection_chrome_strokes_rect_and_fills_handle() {
        let mut display = solid(40, 40, [0, 0, 0, 255]);
        let logo_rect = Rect::new(10.0, 10.0, 30.0, 30.0);
        let handle = Rect::new(24.0, 24.0, 36.0, 36.0);
        draw_logo_selection(&mut display, logo_rect, handle).unwrap();
        let accent = premul_rgba8(ACCENT_RGB[0], ACCENT_RGB[1], ACCENT_RGB[2], 1.0);
        assert_eq!(display.pixel(10, 10), accent);
        assert_eq!(display.pixel(30 - 1, 20), accent); // right edge stroke
        assert_eq!(display.pixel(34, 34), accent); // handle fill
        assert_eq!(display.pixel(20, 20), [0, 0, 0, 255]); // interior untouched
    }
}

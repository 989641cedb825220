pub use kurbo::{Point, Rect, Size, Vec2};

use crate::error::{RetouchError, RetouchResult};

/// Normalized rectangle spanned by two drag corners, in either order.
pub fn rect_from_corners(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

pub fn point_in_rect(p: Point, rect: &Rect) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// Fit an image's aspect ratio into the container minus fixed padding on
/// each side. The resulting surface never exceeds the padded container.
pub fn fit_display_size(image: Size, container: Size, padding: f64) -> RetouchResult<Size> {
    if image.width <= 0.0 || image.height <= 0.0 {
        return Err(RetouchError::validation("image dimensions must be > 0"));
    }
    let max_width = container.width - 2.0 * padding;
    let max_height = container.height - 2.0 * padding;
    if max_width <= 0.0 || max_height <= 0.0 {
        return Err(RetouchError::validation(
            "container too small for configured padding",
        ));
    }

    let aspect = image.width / image.height;
    let mut width = max_width;
    let mut height = max_width / aspect;
    if height > max_height {
        height = max_height;
        width = max_height * aspect;
    }
    Ok(Size::new(width, height))
}

/// Display-space to buffer-space conversion, derived from the ratio of the
/// full-resolution buffer to the visible surface. Stored overlay data stays
/// in display-space; mapping happens only at composite time.
#[derive(Clone, Copy, Debug)]
pub struct Mapper {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Mapper {
    pub fn new(buffer: Size, display: Size) -> RetouchResult<Self> {
        if display.width <= 0.0 || display.height <= 0.0 {
            return Err(RetouchError::validation("display size must be > 0"));
        }
        Ok(Self {
            scale_x: buffer.width / display.width,
            scale_y: buffer.height / display.height,
        })
    }

    pub fn to_buffer(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x0 * self.scale_x,
            rect.y0 * self.scale_y,
            rect.x1 * self.scale_x,
            rect.y1 * self.scale_y,
        )
    }
}

/// Integer pixel rectangle in buffer-space, floored and clamped to the
/// buffer bounds. `None` when nothing of the rect survives clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn clamp_from(rect: Rect, buffer_width: u32, buffer_height: u32) -> Option<Self> {
        let x = rect.x0.floor().max(0.0) as u32;
        let y = rect.y0.floor().max(0.0) as u32;
        if x >= buffer_width || y >= buffer_height {
            return None;
        }
        let mut width = rect.width().floor() as u32;
        let mut height = rect.height().floor() as u32;
        if x + width > buffer_width {
            width = buffer_width - x;
        }
        if y + height > buffer_height {
            height = buffer_height - y;
        }
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }
}

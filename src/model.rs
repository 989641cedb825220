use std::sync::Arc;

use crate::{
    assets::ImageRef,
    error::{RetouchError, RetouchResult},
    geom::{Point, Rect},
    pixmap::Pixmap,
};

/// Blur strength setting bounds; read at region creation time only.
pub const BLUR_STRENGTH_MIN: u32 = 2;
pub const BLUR_STRENGTH_MAX: u32 = 30;
pub const BLUR_STRENGTH_DEFAULT: u32 = 10;

/// Drag rectangles below these display-space sizes are discarded silently.
pub const CROP_MIN_SIZE: f64 = 10.0;
pub const BLUR_MIN_SIZE: f64 = 5.0;

/// Logo overlay geometry, display-space.
pub const LOGO_DEFAULT_ORIGIN: f64 = 20.0;
pub const LOGO_MAX_SIZE: f64 = 150.0;
pub const LOGO_MIN_WIDTH: f64 = 20.0;
pub const RESIZE_HANDLE_SIZE: f64 = 12.0;

pub const HISTORY_CAP: usize = 20;
pub const PREVIEW_WIDTH: u32 = 250;
pub const SURFACE_PADDING: f64 = 20.0;

/// Accent color used for selection chrome and the blur drag preview.
pub const ACCENT_RGB: [u8; 3] = [79, 70, 229];

pub const DEFAULT_EXPORT_FILENAME: &str = "edited-image.png";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Crop,
    Blur,
    Logo,
}

/// A non-destructive blur overlay. The rectangle is display-space at
/// creation time; the strength is fixed when the region is drawn and is
/// unaffected by later changes to the strength setting.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlurRegion {
    pub rect: Rect,
    pub strength: u32,
}

impl BlurRegion {
    pub fn validate(&self) -> RetouchResult<()> {
        if !(BLUR_STRENGTH_MIN..=BLUR_STRENGTH_MAX).contains(&self.strength) {
            return Err(RetouchError::validation(format!(
                "blur strength {} outside [{BLUR_STRENGTH_MIN}, {BLUR_STRENGTH_MAX}]",
                self.strength
            )));
        }
        if self.rect.width() < BLUR_MIN_SIZE || self.rect.height() < BLUR_MIN_SIZE {
            return Err(RetouchError::validation(format!(
                "blur region below minimum {BLUR_MIN_SIZE}x{BLUR_MIN_SIZE}"
            )));
        }
        Ok(())
    }
}

/// A logo layer composited over the image. Geometry is display-space;
/// `aspect_ratio` (height/width) is preserved under resize. The decoded
/// pixmap is shared read-only; `source` is the re-loadable encoding kept
/// for history snapshots.
#[derive(Clone, Debug)]
pub struct LogoOverlay {
    pub image: Arc<Pixmap>,
    pub source: ImageRef,
    pub rect: Rect,
    pub aspect_ratio: f64,
}

impl LogoOverlay {
    /// Fixed-size square grip centered on the bottom-right corner; the only
    /// resize affordance.
    pub fn resize_handle_rect(&self) -> Rect {
        let half = RESIZE_HANDLE_SIZE / 2.0;
        Rect::new(
            self.rect.x1 - half,
            self.rect.y1 - half,
            self.rect.x1 + half,
            self.rect.y1 + half,
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        crate::geom::point_in_rect(point, &self.rect)
    }
}

/// Serializable form of a logo overlay inside a history snapshot: the live
/// pixmap handle is replaced by its re-loadable source.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogoSnapshot {
    pub source: ImageRef,
    pub rect: Rect,
    pub aspect_ratio: f64,
}

/// Fully independent copy of editor state for undo. Images are referenced
/// by their encodings, never by live handles.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub image: ImageRef,
    pub blur_regions: Vec<BlurRegion>,
    pub logos: Vec<LogoSnapshot>,
}

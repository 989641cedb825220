use std::sync::Arc;

use crate::{
    assets::ImageRef,
    geom::{Point, Rect, Size, Vec2},
    model::{
        BLUR_MIN_SIZE, BlurRegion, LOGO_DEFAULT_ORIGIN, LOGO_MAX_SIZE, LOGO_MIN_WIDTH,
        LogoOverlay,
    },
    pixmap::Pixmap,
};

/// Ordered overlay collections composited on top of the edit buffer.
/// Z-order is insertion order: later entries draw on top and hit-test
/// first. All geometry is display-space.
#[derive(Clone, Debug, Default)]
pub struct OverlayStack {
    blurs: Vec<BlurRegion>,
    logos: Vec<LogoOverlay>,
    selected: Option<usize>,
}

impl OverlayStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blur_regions(&self) -> &[BlurRegion] {
        &self.blurs
    }

    pub fn logos(&self) -> &[LogoOverlay] {
        &self.logos
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&LogoOverlay> {
        self.selected.map(|i| &self.logos[i])
    }

    pub fn select(&mut self, index: Option<usize>) {
        debug_assert!(index.is_none_or(|i| i < self.logos.len()));
        self.selected = index;
    }

    /// Append a blur region. Regions below the display-space minimum are
    /// rejected as a no-op; returns whether the region was added.
    pub fn add_blur(&mut self, rect: Rect, strength: u32) -> bool {
        if rect.width() < BLUR_MIN_SIZE || rect.height() < BLUR_MIN_SIZE {
            return false;
        }
        self.blurs.push(BlurRegion { rect, strength });
        true
    }

    /// Append a logo at the default origin, sized to fit the surface, and
    /// select it. Width is `min(LOGO_MAX_SIZE, display_width / 4)`; height
    /// follows the image's aspect ratio.
    pub fn add_logo(&mut self, image: Arc<Pixmap>, source: ImageRef, display_width: f64) {
        let aspect_ratio = f64::from(image.height()) / f64::from(image.width());
        let width = LOGO_MAX_SIZE.min(display_width / 4.0);
        let rect = Rect::new(
            LOGO_DEFAULT_ORIGIN,
            LOGO_DEFAULT_ORIGIN,
            LOGO_DEFAULT_ORIGIN + width,
            LOGO_DEFAULT_ORIGIN + width * aspect_ratio,
        );
        self.logos.push(LogoOverlay {
            image,
            source,
            rect,
            aspect_ratio,
        });
        self.selected = Some(self.logos.len() - 1);
    }

    /// Topmost logo containing the point, if any.
    pub fn hit_test(&self, point: Point) -> Option<usize> {
        self.logos
            .iter()
            .enumerate()
            .rev()
            .find(|(_, logo)| logo.contains(point))
            .map(|(i, _)| i)
    }

    /// Translate the selected logo, clamped fully inside the surface. An
    /// overlay larger than the surface on an axis pins to that axis' start
    /// edge.
    pub fn move_selected(&mut self, delta: Vec2, display: Size) {
        let Some(index) = self.selected else {
            return;
        };
        let logo = &mut self.logos[index];
        let size = logo.rect.size();
        let x = (logo.rect.x0 + delta.x)
            .min(display.width - size.width)
            .max(0.0);
        let y = (logo.rect.y0 + delta.y)
            .min(display.height - size.height)
            .max(0.0);
        logo.rect = Rect::new(x, y, x + size.width, y + size.height);
    }

    /// Resize the selected logo toward the pointer, anchored at its
    /// top-left corner. Width is clamped to
    /// `[LOGO_MIN_WIDTH, display_width - x]`; height follows the preserved
    /// aspect ratio.
    pub fn resize_selected(&mut self, pointer: Point, display_width: f64) {
        let Some(index) = self.selected else {
            return;
        };
        let logo = &mut self.logos[index];
        let mut width = (pointer.x - logo.rect.x0).max(LOGO_MIN_WIDTH);
        if logo.rect.x0 + width > display_width {
            width = display_width - logo.rect.x0;
        }
        logo.rect = Rect::new(
            logo.rect.x0,
            logo.rect.y0,
            logo.rect.x0 + width,
            logo.rect.y0 + width * logo.aspect_ratio,
        );
    }

    pub fn clear(&mut self) {
        self.blurs.clear();
        self.logos.clear();
        self.selected = None;
    }

    /// Replace both collections wholesale (history restore). Selection does
    /// not survive a restore.
    pub fn replace(&mut self, blurs: Vec<BlurRegion>, logos: Vec<LogoOverlay>) {
        self.blurs = blurs;
        self.logos = logos;
        self.selected = None;
    }
}

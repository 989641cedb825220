use crate::{
    error::{RetouchError, RetouchResult},
    geom::{PixelRect, Size},
};

/// Owned software raster surface. Premultiplied RGBA8, row-major, tightly
/// packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    pub fn new(width: u32, height: u32) -> RetouchResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> RetouchResult<Self> {
        let len = checked_len(width, height)?;
        if data.len() != len {
            return Err(RetouchError::validation(
                "pixmap data must match width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Full-surface copy from an equally-sized pixmap.
    pub fn copy_from(&mut self, src: &Pixmap) -> RetouchResult<()> {
        if src.width != self.width || src.height != self.height {
            return Err(RetouchError::compositing(
                "copy_from expects matching pixmap dimensions",
            ));
        }
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Copy of a sub-region as a standalone pixmap. The region must lie
    /// within bounds (PixelRect::clamp_from guarantees this).
    pub fn extract(&self, region: PixelRect) -> RetouchResult<Pixmap> {
        if region.x + region.width > self.width || region.y + region.height > self.height {
            return Err(RetouchError::compositing(
                "extract region exceeds pixmap bounds",
            ));
        }
        let mut out = Pixmap::new(region.width, region.height)?;
        let src_stride = self.width as usize * 4;
        let dst_stride = region.width as usize * 4;
        for row in 0..region.height as usize {
            let src_off = (region.y as usize + row) * src_stride + region.x as usize * 4;
            let dst_off = row * dst_stride;
            out.data[dst_off..dst_off + dst_stride]
                .copy_from_slice(&self.data[src_off..src_off + dst_stride]);
        }
        Ok(out)
    }

    /// Write a pixmap back over a sub-region at the same position it was
    /// extracted from, replacing the pixels there.
    pub fn insert(&mut self, region: PixelRect, src: &Pixmap) -> RetouchResult<()> {
        if src.width != region.width || src.height != region.height {
            return Err(RetouchError::compositing(
                "insert expects pixmap matching the region size",
            ));
        }
        if region.x + region.width > self.width || region.y + region.height > self.height {
            return Err(RetouchError::compositing(
                "insert region exceeds pixmap bounds",
            ));
        }
        let dst_stride = self.width as usize * 4;
        let src_stride = region.width as usize * 4;
        for row in 0..region.height as usize {
            let dst_off = (region.y as usize + row) * dst_stride + region.x as usize * 4;
            let src_off = row * src_stride;
            self.data[dst_off..dst_off + src_stride]
                .copy_from_slice(&src.data[src_off..src_off + src_stride]);
        }
        Ok(())
    }

    /// Scale `src` into `dest` with bilinear sampling and source-over
    /// blending. Sampling clamps to the source edges.
    pub fn draw_scaled_over(&mut self, src: &Pixmap, dest: PixelRect) -> RetouchResult<()> {
        if dest.x + dest.width > self.width || dest.y + dest.height > self.height {
            return Err(RetouchError::compositing(
                "draw_scaled_over dest exceeds pixmap bounds",
            ));
        }
        if src.width == 0 || src.height == 0 {
            return Ok(());
        }

        let sx_step = f64::from(src.width) / f64::from(dest.width);
        let sy_step = f64::from(src.height) / f64::from(dest.height);
        for dy in 0..dest.height {
            let sy = (f64::from(dy) + 0.5) * sy_step - 0.5;
            for dx in 0..dest.width {
                let sx = (f64::from(dx) + 0.5) * sx_step - 0.5;
                let sampled = src.sample_bilinear(sx, sy);
                let idx = (((dest.y + dy) as usize) * (self.width as usize)
                    + (dest.x + dx) as usize)
                    * 4;
                let dst_px = [
                    self.data[idx],
                    self.data[idx + 1],
                    self.data[idx + 2],
                    self.data[idx + 3],
                ];
                let out = over(dst_px, sampled);
                self.data[idx..idx + 4].copy_from_slice(&out);
            }
        }
        Ok(())
    }

    fn sample_bilinear(&self, x: f64, y: f64) -> [u8; 4] {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - f64::from(x0);
        let fy = y - f64::from(y0);

        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x1, y0);
        let p01 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
            let bot = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
            out[c] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
        }
        out
    }

    /// Fill a region with a premultiplied color, source-over.
    pub fn fill_rect_over(&mut self, region: PixelRect, color: [u8; 4]) -> RetouchResult<()> {
        if region.x + region.width > self.width || region.y + region.height > self.height {
            return Err(RetouchError::compositing(
                "fill_rect_over region exceeds pixmap bounds",
            ));
        }
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
                let dst_px = [
                    self.data[idx],
                    self.data[idx + 1],
                    self.data[idx + 2],
                    self.data[idx + 3],
                ];
                let out = over(dst_px, color);
                self.data[idx..idx + 4].copy_from_slice(&out);
            }
        }
        Ok(())
    }

    /// Stroke the border of a region (line width in whole pixels, drawn
    /// inside the region), source-over.
    pub fn stroke_rect_over(
        &mut self,
        region: PixelRect,
        line_width: u32,
        color: [u8; 4],
    ) -> RetouchResult<()> {
        let lw = line_width.min(region.width / 2).min(region.height / 2).max(1);
        let top = PixelRect {
            x: region.x,
            y: region.y,
            width: region.width,
            height: lw,
        };
        let bottom = PixelRect {
            x: region.x,
            y: region.y + region.height - lw,
            width: region.width,
            height: lw,
        };
        let left = PixelRect {
            x: region.x,
            y: region.y,
            width: lw,
            height: region.height,
        };
        let right = PixelRect {
            x: region.x + region.width - lw,
            y: region.y,
            width: lw,
            height: region.height,
        };
        for edge in [top, bottom, left, right] {
            self.fill_rect_over(edge, color)?;
        }
        Ok(())
    }
}

/// Source-over for premultiplied RGBA8: `out = src + dst * (1 - src_a)`.
pub fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    if src[3] == 255 {
        return src;
    }
    if src[3] == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Premultiplied color from straight RGB and a [0,1] alpha.
pub fn premul_rgba8(r: u8, g: u8, b: u8, alpha: f64) -> [u8; 4] {
    let a = ((alpha.clamp(0.0, 1.0) * 255.0).round()) as u16;
    [
        mul_div255(u16::from(r), a),
        mul_div255(u16::from(g), a),
        mul_div255(u16::from(b), a),
        a as u8,
    ]
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn checked_len(width: u32, height: u32) -> RetouchResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| RetouchError::validation("pixmap size overflow"))
}

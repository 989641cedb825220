use crate::{
    error::{RetouchError, RetouchResult},
    geom::PixelRect,
    model::{BLUR_STRENGTH_MAX, BLUR_STRENGTH_MIN},
    pixmap::Pixmap,
};

/// Blur a sub-rectangle of `pixmap` in place. The region is lifted into a
/// scratch copy, blurred with a separable Gaussian, and written back at the
/// same position; pixels outside the region are untouched.
///
/// `strength` follows the editor's strength setting: sigma = strength/2,
/// kernel radius = strength, with clamp-to-edge sampling inside the region.
pub fn blur_region(pixmap: &mut Pixmap, region: PixelRect, strength: u32) -> RetouchResult<()> {
    if !(BLUR_STRENGTH_MIN..=BLUR_STRENGTH_MAX).contains(&strength) {
        return Err(RetouchError::validation(format!(
            "blur strength must be in [{BLUR_STRENGTH_MIN}, {BLUR_STRENGTH_MAX}], got {strength}"
        )));
    }

    let scratch = pixmap.extract(region)?;
    let blurred = blur_pixmap(&scratch, strength, f64::from(strength) * 0.5)?;
    pixmap.insert(region, &blurred)
}

fn blur_pixmap(src: &Pixmap, radius: u32, sigma: f64) -> RetouchResult<Pixmap> {
    if radius == 0 {
        return Ok(src.clone());
    }
    let kernel = gaussian_kernel_q16(radius, sigma)?;

    let (width, height) = (src.width(), src.height());
    let mut tmp = Pixmap::new(width, height)?;
    let mut out = Pixmap::new(width, height)?;

    horizontal_pass(src.data(), tmp.data_mut(), width, height, &kernel);
    vertical_pass(tmp.data(), out.data_mut(), width, height, &kernel);
    Ok(out)
}

/// Normalized Gaussian weights in Q16 fixed point, summing to exactly 2^16.
fn gaussian_kernel_q16(radius: u32, sigma: f64) -> RetouchResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(RetouchError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(RetouchError::compositing("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Force the quantized sum to the exact fixed-point one by adjusting the
    // center tap.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let mid_val = i64::from(weights[mid]);
        weights[mid] = (mid_val + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dx = ki as i32 - radius;
                let sx = (x + dx).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dy = ki as i32 - radius;
                let sy = (y + dy).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}

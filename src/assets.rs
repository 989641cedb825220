use std::io::Cursor;
use std::sync::Arc;

use crate::{
    error::{RetouchError, RetouchResult},
    pixmap::Pixmap,
};

/// Re-loadable reference to image content: the encoded bytes themselves,
/// shared between overlays and history snapshots. Decoding an `ImageRef`
/// always yields the same pixels, which is what makes snapshots independent
/// of live editor state.
#[derive(Clone)]
pub struct ImageRef {
    bytes: Arc<Vec<u8>>,
}

impl ImageRef {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes) || self.bytes == other.bytes
    }
}

impl Eq for ImageRef {}

impl std::fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRef")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl serde::Serialize for ImageRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(self.bytes.as_slice(), serializer)
    }
}

impl<'de> serde::Deserialize<'de> for ImageRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(Vec::<u8>::deserialize(deserializer)?))
    }
}

/// Decode encoded image bytes into a premultiplied-RGBA8 pixmap.
pub fn decode_image(bytes: &[u8]) -> RetouchResult<Pixmap> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| RetouchError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    Pixmap::from_raw(width, height, data)
}

/// Encode a pixmap as PNG (lossless). Premultiplied alpha is undone before
/// encoding so the file carries straight RGBA.
pub fn encode_png(pixmap: &Pixmap) -> RetouchResult<Vec<u8>> {
    let mut data = pixmap.data().to_vec();
    unpremultiply_rgba8_in_place(&mut data);

    let img = image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .ok_or_else(|| RetouchError::encode("pixmap buffer does not match its dimensions"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RetouchError::encode(format!("write png: {e}")))?;
    Ok(buf)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in 0..3 {
            px[c] = ((u32::from(px[c]) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

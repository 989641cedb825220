#![forbid(unsafe_code)]

pub mod assets;
pub mod blur;
pub mod composite;
pub mod controller;
pub mod engine;
pub mod error;
pub mod geom;
pub mod history;
pub mod model;
pub mod overlay;
pub mod pixmap;

pub use assets::{ImageRef, decode_image, encode_png};
pub use controller::{CursorHint, DragState};
pub use engine::{DecodeJob, Editor, SurfaceConfig, Ticket};
pub use error::{RetouchError, RetouchResult};
pub use geom::{Mapper, PixelRect, Point, Rect, Size, Vec2};
pub use model::{
    BlurRegion, DEFAULT_EXPORT_FILENAME, LogoOverlay, LogoSnapshot, Snapshot, Tool,
};
pub use pixmap::Pixmap;

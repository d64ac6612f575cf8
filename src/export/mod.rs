//! Saving the displayed frame as an image file.
//!
//! The exporter only ever reads the front buffer. The destination picker
//! and the image encoder are collaborators behind traits so a platform
//! file dialog or another codec can be substituted.

mod encoder;
mod exporter;
mod picker;

pub use encoder::{
    AlphaMode, EncodeError, EncodeParams, ImageEncoder, PixelFormat, PngImageEncoder, DEFAULT_DPI,
};
pub use exporter::{ExportError, ExportOutcome, SaveExporter};
pub use picker::{DirectoryPicker, FilePicker, SaveDestination, SavePicker};

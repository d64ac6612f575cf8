//! Frame presentation pipeline.
//!
//! Converts infrared frames into RGBA and presents them through a pair of
//! buffers whose roles are swapped once a frame is fully written:
//!
//! ```text
//! RawFrame → PixelConverter → back buffer → swap → front buffer → surface / export
//! ```

mod buffers;
mod convert;
mod surface;

pub use buffers::{
    BufferSlot, ColorBuffer, FrameBufferPair, BACK_SEED, BYTES_PER_PIXEL, FRONT_SEED,
};
pub use convert::{convert, ConvertError, PixelConverter, SampleReduction};
pub use surface::{DisplaySurface, HeadlessSurface};

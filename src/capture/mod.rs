//! Infrared frame sources and frame handling.
//!
//! This module models the platform side of the pipeline: permission and
//! source discovery, readers that deliver frame-arrival events from their
//! own thread, and the raw 16-bit frames those events carry.

mod config;
mod frame;
mod mock;
#[cfg(feature = "camera")]
mod native;
mod source;

pub use config::{CaptureConfig, ConfigError, ExportConfig, FileConfig, MockConfig};
pub use frame::{BufferLock, FrameArrival, RawFrame, BYTES_PER_SAMPLE};
pub use mock::{synthetic_frame, MockFeed, MockProvider, MockSource};
#[cfg(feature = "camera")]
pub use native::{NativeProvider, NativeSource};
pub use source::{
    AccessStatus, FrameReader, FrameSource, FrameSourceProvider, SourceError, ThreadReader,
    VideoProfile,
};

//! Infrared Frame Capture Library
//!
//! Captures frames from an infrared sensor, converts each 16-bit
//! single-channel frame into an RGBA image, presents it through a pair of
//! double-buffered images, and saves the displayed frame as a PNG.
//!
//! # Architecture
//!
//! ```text
//! frame source ─(reader thread)→ FrameSink ─→ UiDispatcher
//!                                                  │
//!                               ┌──────────────────┘ (UI thread)
//!                               ↓
//!   CaptureSession: PixelConverter → back buffer → swap → front buffer
//!                                                            ↓
//!                                          DisplaySurface / SaveExporter
//! ```
//!
//! # Design Principles
//!
//! - **Confinement**: buffers are only touched by the thread draining the
//!   dispatcher; readers post events instead of writing pixels
//! - **Role discipline**: capture writes only the back buffer, export and
//!   display read only the front buffer, and the swap happens after a
//!   frame is fully converted
//! - **Bounds-checked conversion**: short frames fail loudly and leave the
//!   buffers untouched
//!
//! # Example
//!
//! ```no_run
//! use ir_capture::{
//!     capture::{CaptureConfig, MockProvider, MockSource, VideoProfile},
//!     dispatch::UiDispatcher,
//!     export::{FilePicker, SaveExporter},
//!     pipeline::HeadlessSurface,
//!     session::CaptureSession,
//!     CaptureApp,
//! };
//! use std::time::Duration;
//!
//! let profile = VideoProfile::new(340, 340, 30);
//! let mut provider = MockProvider::new()
//!     .with_source(MockSource::new(profile).synthetic(Some(10), Duration::from_millis(33)));
//!
//! let dispatcher = UiDispatcher::new();
//! let session = CaptureSession::new(CaptureConfig::default(), HeadlessSurface::new());
//! let mut app = CaptureApp::new(session, SaveExporter::new("IR_Capture"), FilePicker::new("ir.png"));
//!
//! app.start(&mut provider, &dispatcher).unwrap();
//! app.run_until_idle(&dispatcher, Duration::from_secs(1));
//! app.save().unwrap();
//! app.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod app;
pub mod capture;
pub mod dispatch;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod session;

// Re-export commonly used types at crate root
pub use app::CaptureApp;
pub use capture::{CaptureConfig, FileConfig, FrameArrival, MockProvider, MockSource, RawFrame};
pub use dispatch::{FrameSink, UiDispatcher, UiEvent, UiHandle};
pub use export::{ExportOutcome, SaveExporter};
pub use pipeline::{ColorBuffer, FrameBufferPair, PixelConverter, SampleReduction};
pub use session::{CaptureSession, FrameOutcome, SessionError, SessionState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Prometheus metrics for the capture pipeline.
//!
//! # Metrics Exposed
//!
//! ## Session
//! - `ir_capture_streaming` - 1 while the session streams
//! - `ir_capture_frame_width` / `ir_capture_frame_height` - selected profile
//!
//! ## Frames
//! - `ir_capture_frames_presented_total` - frames converted and swapped to front
//! - `ir_capture_frames_skipped_total` - arrivals without an openable frame
//! - `ir_capture_frames_failed_total` - frames rejected by conversion
//! - `ir_capture_frames_discarded_total` - arrivals outside streaming
//! - `ir_capture_buffer_swaps_total` - front/back role flips
//!
//! ## Exports
//! - `ir_capture_exports_saved_total`
//! - `ir_capture_exports_cancelled_total`
//! - `ir_capture_exports_failed_total`
//!
//! The HTTP endpoint (`/metrics`, `/health`) needs the `metrics` feature.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{ExportStats, MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};

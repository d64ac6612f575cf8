//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

use crate::session::{SessionState, SessionStats};

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Save-request counters kept by the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub saved: u64,
    pub cancelled: u64,
    pub failed: u64,
}

/// A snapshot of system state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the session is currently streaming.
    pub streaming: bool,
    /// Width of the selected profile (0 before selection).
    pub frame_width: u32,
    /// Height of the selected profile (0 before selection).
    pub frame_height: u32,
    /// Frames converted and swapped to front.
    pub frames_presented: u64,
    /// Arrivals that carried no frame.
    pub frames_skipped: u64,
    /// Frames rejected by conversion or dimension checks.
    pub frames_failed: u64,
    /// Arrivals received outside streaming.
    pub frames_discarded: u64,
    /// Front/back role flips.
    pub swaps: u64,
    /// Save requests by outcome.
    pub exports: ExportStats,
}

/// Prometheus metrics registry for the capture pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    streaming: IntGauge,
    frame_width: IntGauge,
    frame_height: IntGauge,

    // Frame metrics
    frames_presented: IntCounter,
    frames_skipped: IntCounter,
    frames_failed: IntCounter,
    frames_discarded: IntCounter,
    swaps: IntCounter,

    // Export metrics
    exports_saved: IntCounter,
    exports_cancelled: IntCounter,
    exports_failed: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let streaming = IntGauge::new(
            "ir_capture_streaming",
            "Whether the capture session is streaming (1=streaming, 0=not)",
        )?;
        let frame_width = IntGauge::new("ir_capture_frame_width", "Width of the streamed profile")?;
        let frame_height =
            IntGauge::new("ir_capture_frame_height", "Height of the streamed profile")?;

        let frames_presented = IntCounter::new(
            "ir_capture_frames_presented_total",
            "Frames converted and presented",
        )?;
        let frames_skipped = IntCounter::new(
            "ir_capture_frames_skipped_total",
            "Frame arrivals without an openable frame",
        )?;
        let frames_failed = IntCounter::new(
            "ir_capture_frames_failed_total",
            "Frames rejected by conversion or dimension checks",
        )?;
        let frames_discarded = IntCounter::new(
            "ir_capture_frames_discarded_total",
            "Frame arrivals received while not streaming",
        )?;
        let swaps = IntCounter::new("ir_capture_buffer_swaps_total", "Front/back buffer swaps")?;

        let exports_saved =
            IntCounter::new("ir_capture_exports_saved_total", "Frames saved to disk")?;
        let exports_cancelled = IntCounter::new(
            "ir_capture_exports_cancelled_total",
            "Save requests cancelled at the destination picker",
        )?;
        let exports_failed =
            IntCounter::new("ir_capture_exports_failed_total", "Save requests that failed")?;

        registry.register(Box::new(streaming.clone()))?;
        registry.register(Box::new(frame_width.clone()))?;
        registry.register(Box::new(frame_height.clone()))?;
        registry.register(Box::new(frames_presented.clone()))?;
        registry.register(Box::new(frames_skipped.clone()))?;
        registry.register(Box::new(frames_failed.clone()))?;
        registry.register(Box::new(frames_discarded.clone()))?;
        registry.register(Box::new(swaps.clone()))?;
        registry.register(Box::new(exports_saved.clone()))?;
        registry.register(Box::new(exports_cancelled.clone()))?;
        registry.register(Box::new(exports_failed.clone()))?;

        Ok(Self {
            registry,
            streaming,
            frame_width,
            frame_height,
            frames_presented,
            frames_skipped,
            frames_failed,
            frames_discarded,
            swaps,
            exports_saved,
            exports_cancelled,
            exports_failed,
        })
    }

    /// Updates all metrics from a snapshot of system state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.streaming.set(i64::from(snapshot.streaming));
        self.frame_width.set(i64::from(snapshot.frame_width));
        self.frame_height.set(i64::from(snapshot.frame_height));

        // Counters only move forward by the difference.
        advance(&self.frames_presented, snapshot.frames_presented);
        advance(&self.frames_skipped, snapshot.frames_skipped);
        advance(&self.frames_failed, snapshot.frames_failed);
        advance(&self.frames_discarded, snapshot.frames_discarded);
        advance(&self.swaps, snapshot.swaps);
        advance(&self.exports_saved, snapshot.exports.saved);
        advance(&self.exports_cancelled, snapshot.exports.cancelled);
        advance(&self.exports_failed, snapshot.exports.failed);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the session and export counters.
    pub fn from_session(
        state: SessionState,
        profile: Option<(u32, u32)>,
        stats: SessionStats,
        exports: ExportStats,
    ) -> Self {
        let (frame_width, frame_height) = profile.unwrap_or((0, 0));
        Self {
            streaming: state == SessionState::Streaming,
            frame_width,
            frame_height,
            frames_presented: stats.frames_presented,
            frames_skipped: stats.frames_skipped,
            frames_failed: stats.frames_failed,
            frames_discarded: stats.frames_discarded,
            swaps: stats.swaps,
            exports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let stats = SessionStats {
            frames_presented: 5,
            frames_skipped: 1,
            frames_failed: 0,
            frames_discarded: 0,
            swaps: 5,
        };
        let exports = ExportStats {
            saved: 2,
            cancelled: 1,
            failed: 0,
        };
        registry.update(&MetricsSnapshot::from_session(
            SessionState::Streaming,
            Some((340, 340)),
            stats,
            exports,
        ));

        let output = registry.encode().unwrap();
        assert!(output.contains("ir_capture_streaming 1"));
        assert!(output.contains("ir_capture_frame_width 340"));
        assert!(output.contains("ir_capture_frames_presented_total 5"));
        assert!(output.contains("ir_capture_exports_saved_total 2"));
    }

    #[test]
    fn test_counters_never_go_backwards() {
        let registry = MetricsRegistry::new().unwrap();

        registry.update(&MetricsSnapshot {
            swaps: 10,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            swaps: 4,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("ir_capture_buffer_swaps_total 10"));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("ir_capture_streaming"));
        assert!(output.contains("ir_capture_frames_skipped_total"));
        assert!(output.contains("ir_capture_exports_cancelled_total"));
    }
}

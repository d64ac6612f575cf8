//! Application wiring: the UI-context event loop.
//!
//! [`CaptureApp`] is the single consumer of the [`UiDispatcher`]. Every
//! event (frame arrival, save request, shutdown) is handled to completion
//! before the next one is taken, so a save always reads a complete front
//! buffer and never races a swap.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use crate::capture::FrameSourceProvider;
use crate::dispatch::{UiDispatcher, UiEvent};
use crate::export::{ExportError, ExportOutcome, SaveExporter, SavePicker};
use crate::metrics::{ExportStats, MetricsRegistry, MetricsSnapshot};
use crate::pipeline::DisplaySurface;
use crate::session::{CaptureSession, SessionError};

/// Capture session plus save handling, driven by UI events.
pub struct CaptureApp<S: DisplaySurface, P: SavePicker> {
    session: CaptureSession<S>,
    exporter: SaveExporter,
    picker: P,
    exports: ExportStats,
    last_export: Option<Result<ExportOutcome, String>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<S: DisplaySurface, P: SavePicker> CaptureApp<S, P> {
    pub fn new(session: CaptureSession<S>, exporter: SaveExporter, picker: P) -> Self {
        Self {
            session,
            exporter,
            picker,
            exports: ExportStats::default(),
            last_export: None,
            metrics: None,
        }
    }

    /// Mirrors counters into `registry` after every event.
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Initializes the session, delivering frames into `dispatcher`.
    pub fn start(
        &mut self,
        provider: &mut dyn FrameSourceProvider,
        dispatcher: &UiDispatcher,
    ) -> Result<(), SessionError> {
        let result = self.session.initialize(provider, dispatcher.sink());
        self.publish_metrics();
        result
    }

    /// Handles one event. Breaks on shutdown.
    pub fn handle(&mut self, event: UiEvent) -> ControlFlow<()> {
        let flow = match event {
            UiEvent::FrameArrived(arrival) => {
                if let Err(e) = self.session.on_frame_arrived(arrival) {
                    tracing::warn!(error = %e, "Dropping frame");
                }
                ControlFlow::Continue(())
            }
            UiEvent::SaveRequested => {
                let result = self.save();
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Save failed");
                }
                self.last_export = Some(result.map_err(|e| e.to_string()));
                ControlFlow::Continue(())
            }
            UiEvent::Shutdown => {
                self.session.stop();
                ControlFlow::Break(())
            }
        };
        self.publish_metrics();
        flow
    }

    /// Saves the current front buffer through the picker.
    pub fn save(&mut self) -> Result<ExportOutcome, ExportError> {
        let result = match self.session.front() {
            Some(front) => self.exporter.save(front, &mut self.picker),
            None => Err(ExportError::NothingToExport),
        };
        match &result {
            Ok(ExportOutcome::Saved(_)) => self.exports.saved += 1,
            Ok(ExportOutcome::Cancelled) => self.exports.cancelled += 1,
            Err(_) => self.exports.failed += 1,
        }
        self.publish_metrics();
        result
    }

    /// Handles events until shutdown.
    pub fn run(&mut self, dispatcher: &UiDispatcher) {
        while let Some(event) = dispatcher.next() {
            if self.handle(event).is_break() {
                break;
            }
        }
    }

    /// Handles events until shutdown or until none arrives within `idle`.
    ///
    /// Returns `true` if a shutdown event ended the loop.
    pub fn run_until_idle(&mut self, dispatcher: &UiDispatcher, idle: Duration) -> bool {
        while let Some(event) = dispatcher.next_timeout(idle) {
            if self.handle(event).is_break() {
                return true;
            }
        }
        tracing::info!(idle_ms = idle.as_millis() as u64, "Frame source went idle");
        false
    }

    /// Handles every queued event without blocking.
    ///
    /// Returns the number of events handled.
    pub fn run_pending(&mut self, dispatcher: &UiDispatcher) -> usize {
        let mut handled = 0;
        while let Some(event) = dispatcher.try_next() {
            handled += 1;
            if self.handle(event).is_break() {
                break;
            }
        }
        handled
    }

    /// Stops the session and returns the export counters.
    pub fn shutdown(&mut self) -> ExportStats {
        self.session.stop();
        self.publish_metrics();
        self.exports
    }

    pub fn session(&self) -> &CaptureSession<S> {
        &self.session
    }

    pub fn picker(&self) -> &P {
        &self.picker
    }

    pub fn export_stats(&self) -> ExportStats {
        self.exports
    }

    /// Outcome of the last save triggered by a [`UiEvent::SaveRequested`].
    pub fn last_export(&self) -> Option<&Result<ExportOutcome, String>> {
        self.last_export.as_ref()
    }

    fn publish_metrics(&self) {
        if let Some(registry) = &self.metrics {
            let profile = self.session.profile().map(|p| (p.width, p.height));
            registry.update(&MetricsSnapshot::from_session(
                self.session.state(),
                profile,
                self.session.stats(),
                self.exports,
            ));
        }
    }
}

//! The UI-affine execution context.
//!
//! Frame readers run on their own threads and must not touch the frame
//! buffers. They post events into a single-consumer queue instead; the
//! thread that drains the queue owns the session, its buffers and the
//! display surface. Events from one sender are handled in the order they
//! were posted.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::capture::FrameArrival;

/// Work posted to the UI context.
#[derive(Debug)]
pub enum UiEvent {
    /// A reader delivered a frame-arrival notification.
    FrameArrived(FrameArrival),
    /// The user asked to save the displayed frame.
    SaveRequested,
    /// Stop the session and leave the event loop.
    Shutdown,
}

/// Sending half handed to frame readers.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: Sender<UiEvent>,
}

impl FrameSink {
    /// Posts an arrival to the UI context.
    ///
    /// Returns `false` once the dispatcher is gone; readers should stop.
    pub fn deliver(&self, arrival: FrameArrival) -> bool {
        self.tx.send(UiEvent::FrameArrived(arrival)).is_ok()
    }
}

/// Sending half for user actions (save button, Ctrl-C).
#[derive(Debug, Clone)]
pub struct UiHandle {
    tx: Sender<UiEvent>,
}

impl UiHandle {
    pub fn request_save(&self) -> bool {
        self.tx.send(UiEvent::SaveRequested).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.tx.send(UiEvent::Shutdown).is_ok()
    }
}

/// Single-consumer event queue drained by the UI thread.
#[derive(Debug)]
pub struct UiDispatcher {
    tx: Sender<UiEvent>,
    rx: Receiver<UiEvent>,
}

impl UiDispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// A sink for a frame reader.
    pub fn sink(&self) -> FrameSink {
        FrameSink {
            tx: self.tx.clone(),
        }
    }

    /// A handle for posting user actions.
    pub fn handle(&self) -> UiHandle {
        UiHandle {
            tx: self.tx.clone(),
        }
    }

    /// Takes the next event without blocking.
    pub fn try_next(&self) -> Option<UiEvent> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<UiEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Blocks until the next event.
    pub fn next(&self) -> Option<UiEvent> {
        self.rx.recv().ok()
    }
}

impl Default for UiDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

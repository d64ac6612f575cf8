//! Frame source abstraction.
//!
//! Mirrors the platform's perception API: a provider grants access and
//! enumerates sources, each source advertises video profiles and opens a
//! reader that pushes frame-arrival events into a [`FrameSink`] from its
//! own delivery context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::FrameSink;

/// Outcome of a capture permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Allowed,
    Denied,
}

/// A capture mode supported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoProfile {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Nominal frames per second (0 if unknown).
    pub fps: u32,
}

impl VideoProfile {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }
}

/// Errors raised by frame source collaborators.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("frame source discovery failed: {0}")]
    DiscoveryFailed(String),
    #[error("failed to open frame reader: {0}")]
    OpenFailed(String),
}

/// Entry point to the platform's infrared sources.
pub trait FrameSourceProvider {
    /// Asks the platform for permission to capture.
    fn request_access(&mut self) -> AccessStatus;

    /// Enumerates all infrared sources currently available.
    fn find_all_sources(&mut self) -> Result<Vec<Box<dyn FrameSource>>, SourceError>;
}

/// A single infrared sensor.
pub trait FrameSource {
    /// Human readable name for logging.
    fn name(&self) -> &str;

    /// Video profiles the source can stream, in preference order.
    fn available_video_profiles(&self) -> &[VideoProfile];

    /// Opens a reader streaming `profile`.
    ///
    /// Frame arrivals are delivered through `sink`, typically from a
    /// background thread owned by the reader.
    fn open_reader(
        &mut self,
        profile: &VideoProfile,
        sink: FrameSink,
    ) -> Result<Box<dyn FrameReader>, SourceError>;
}

/// Subscription handle for frame-arrival events.
pub trait FrameReader {
    /// Checks if the reader is still delivering frames.
    fn is_active(&self) -> bool;

    /// Stops delivery and releases the subscription.
    fn close(&mut self);
}

/// Reader backed by a dedicated delivery thread.
///
/// The thread receives a stop flag and must return once it is set.
pub struct ThreadReader {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadReader {
    /// Spawns `deliver` on a named thread.
    pub fn spawn<F>(name: &str, deliver: F) -> Result<Self, SourceError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || deliver(flag))
            .map_err(|e| SourceError::OpenFailed(e.to_string()))?;

        tracing::debug!(thread = name, "Frame reader started");
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Blocks until the delivery thread has exited on its own.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Frame reader thread panicked");
            }
        }
    }
}

impl FrameReader for ThreadReader {
    fn is_active(&self) -> bool {
        !self.stop.load(Ordering::Acquire)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.join();
        tracing::debug!("Frame reader closed");
    }
}

impl Drop for ThreadReader {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.close();
        }
    }
}

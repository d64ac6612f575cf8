//! Capture session state machine.
//!
//! ```text
//! Uninitialized → AwaitingPermission → PermissionDenied
//!                                    → SourceUnavailable
//!                                    → SourceReady → Streaming → Stopped
//! ```
//!
//! A session owns the frame source, its reader and the buffer pair. All
//! methods take `&mut self` and are meant to be called from the thread
//! draining the [`UiDispatcher`](crate::dispatch::UiDispatcher), which is
//! what keeps buffer writes, swaps and front-buffer reads from ever
//! overlapping.

use thiserror::Error;

use crate::capture::{
    AccessStatus, CaptureConfig, FrameArrival, FrameReader, FrameSource, FrameSourceProvider,
    SourceError, VideoProfile,
};
use crate::dispatch::FrameSink;
use crate::pipeline::{
    ColorBuffer, ConvertError, DisplaySurface, FrameBufferPair, HeadlessSurface, PixelConverter,
};

/// Lifecycle state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    AwaitingPermission,
    /// Terminal: the user refused capture.
    PermissionDenied,
    /// Terminal: no source, no usable profile, or the reader failed to open.
    SourceUnavailable,
    SourceReady,
    Streaming,
    Stopped,
}

impl SessionState {
    /// True for states the session never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::PermissionDenied | SessionState::SourceUnavailable | SessionState::Stopped
        )
    }
}

/// Errors reported by a capture session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture permission denied")]
    PermissionDenied,
    #[error("no infrared frame source available")]
    NoSourceAvailable,
    #[error("frame source '{0}' offers no video profile")]
    NoVideoProfile(String),
    #[error("profile {width}x{height} is too large to buffer")]
    ProfileTooLarge { width: u32, height: u32 },
    #[error("operation not valid in state {0:?}")]
    InvalidState(SessionState),
    #[error("frame is {actual_width}x{actual_height}, session streams {expected_width}x{expected_height}")]
    FrameMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("frame conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// What happened to one frame-arrival event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Converted, swapped to front and shown.
    Presented { sequence: u64 },
    /// The event carried no openable frame.
    Skipped,
    /// The session was not streaming.
    Discarded,
}

/// Per-session frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_presented: u64,
    pub frames_skipped: u64,
    pub frames_failed: u64,
    pub frames_discarded: u64,
    pub swaps: u64,
}

/// Bridges a frame source to the double-buffered display pipeline.
pub struct CaptureSession<S: DisplaySurface = HeadlessSurface> {
    config: CaptureConfig,
    converter: PixelConverter,
    surface: S,
    state: SessionState,
    source: Option<Box<dyn FrameSource>>,
    reader: Option<Box<dyn FrameReader>>,
    profile: Option<VideoProfile>,
    buffers: Option<FrameBufferPair>,
    stats: SessionStats,
}

impl<S: DisplaySurface> CaptureSession<S> {
    /// Creates an uninitialized session drawing to `surface`.
    pub fn new(config: CaptureConfig, surface: S) -> Self {
        Self {
            converter: PixelConverter::new(config.sample_reduction),
            config,
            surface,
            state: SessionState::Uninitialized,
            source: None,
            reader: None,
            profile: None,
            buffers: None,
            stats: SessionStats::default(),
        }
    }

    /// Requests permission, picks the first source and profile, and starts
    /// streaming into `sink`.
    ///
    /// Denial and missing sources leave the session in a terminal state
    /// and are reported as errors; they are not retried.
    pub fn initialize(
        &mut self,
        provider: &mut dyn FrameSourceProvider,
        sink: FrameSink,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Uninitialized {
            return Err(SessionError::InvalidState(self.state));
        }

        self.transition(SessionState::AwaitingPermission);
        if provider.request_access() == AccessStatus::Denied {
            tracing::warn!("Capture permission denied");
            self.transition(SessionState::PermissionDenied);
            return Err(SessionError::PermissionDenied);
        }

        let mut source = match provider.find_all_sources() {
            Ok(sources) => match sources.into_iter().next() {
                Some(source) => source,
                None => return Err(self.unavailable(SessionError::NoSourceAvailable)),
            },
            Err(e) => return Err(self.unavailable(e.into())),
        };

        let Some(profile) = source.available_video_profiles().first().copied() else {
            let err = SessionError::NoVideoProfile(source.name().to_string());
            return Err(self.unavailable(err));
        };

        tracing::info!(
            source = source.name(),
            width = profile.width,
            height = profile.height,
            fps = profile.fps,
            "Selected frame source"
        );
        self.transition(SessionState::SourceReady);

        let Some(mut buffers) = FrameBufferPair::try_create(profile.width, profile.height) else {
            let err = SessionError::ProfileTooLarge {
                width: profile.width,
                height: profile.height,
            };
            return Err(self.unavailable(err));
        };
        if self.config.seed_test_pattern {
            buffers.seed_test_pattern();
        }

        // Nothing is kept or bound until the reader is open.
        let reader = match source.open_reader(&profile, sink) {
            Ok(reader) => reader,
            Err(e) => return Err(self.unavailable(e.into())),
        };

        self.surface.bind(buffers.front_slot(), buffers.front());
        self.buffers = Some(buffers);
        self.profile = Some(profile);
        self.reader = Some(reader);
        self.source = Some(source);
        self.transition(SessionState::Streaming);
        Ok(())
    }

    /// Handles one frame-arrival event.
    ///
    /// Converts the frame into the back buffer, invalidates it, swaps and
    /// rebinds the surface to the new front. A frame that fails to convert
    /// is reported and leaves both buffers untouched.
    pub fn on_frame_arrived(&mut self, arrival: FrameArrival) -> Result<FrameOutcome, SessionError> {
        if self.state != SessionState::Streaming {
            self.stats.frames_discarded += 1;
            tracing::debug!(state = ?self.state, "Discarding frame outside streaming");
            return Ok(FrameOutcome::Discarded);
        }
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(SessionError::InvalidState(self.state));
        };

        let Some(frame) = arrival.try_open_frame() else {
            self.stats.frames_skipped += 1;
            tracing::debug!("Frame unavailable, skipping");
            return Ok(FrameOutcome::Skipped);
        };

        if frame.width() != buffers.width() || frame.height() != buffers.height() {
            self.stats.frames_failed += 1;
            return Err(SessionError::FrameMismatch {
                expected_width: buffers.width(),
                expected_height: buffers.height(),
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }

        {
            let lock = frame.lock_buffer();
            if let Err(e) = self.converter.convert_frame(&lock, buffers.back_mut()) {
                self.stats.frames_failed += 1;
                return Err(e.into());
            }
        }

        self.surface.invalidate(buffers.back_slot(), buffers.back());
        buffers.swap();
        self.surface.bind(buffers.front_slot(), buffers.front());

        self.stats.frames_presented += 1;
        self.stats.swaps = buffers.swap_count();
        tracing::trace!(
            sequence = frame.sequence(),
            front = ?buffers.front_slot(),
            "Frame presented"
        );

        Ok(FrameOutcome::Presented {
            sequence: frame.sequence(),
        })
    }

    /// Releases the reader and the source. Safe to call repeatedly.
    ///
    /// The buffer pair is kept so the last frame can still be exported.
    /// A session already in a terminal state keeps that state.
    pub fn stop(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
        self.source = None;
        if !self.state.is_terminal() {
            self.transition(SessionState::Stopped);
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Name of the source being streamed, until the session stops.
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref().map(|s| s.name())
    }

    /// Profile selected during initialization.
    pub fn profile(&self) -> Option<&VideoProfile> {
        self.profile.as_ref()
    }

    pub fn buffers(&self) -> Option<&FrameBufferPair> {
        self.buffers.as_ref()
    }

    /// The displayed buffer, once the session has allocated buffers.
    pub fn front(&self) -> Option<&ColorBuffer> {
        self.buffers.as_ref().map(FrameBufferPair::front)
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// True while the reader reports it is still delivering.
    pub fn is_reader_active(&self) -> bool {
        self.reader.as_ref().is_some_and(|r| r.is_active())
    }

    fn unavailable(&mut self, err: SessionError) -> SessionError {
        tracing::warn!(error = %err, "No usable frame source");
        self.transition(SessionState::SourceUnavailable);
        err
    }

    fn transition(&mut self, next: SessionState) {
        tracing::info!(from = ?self.state, to = ?next, "Capture session state changed");
        self.state = next;
    }
}

impl<S: DisplaySurface> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.stop();
        }
    }
}

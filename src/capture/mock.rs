//! Mock infrared source for tests and demonstration.
//!
//! Generates synthetic 16-bit frames or replays a fixed script of
//! arrivals from a background thread, the same way a platform reader
//! delivers events outside the UI context.

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::frame::{FrameArrival, RawFrame};
use super::source::{
    AccessStatus, FrameReader, FrameSource, FrameSourceProvider, SourceError, ThreadReader,
    VideoProfile,
};
use crate::dispatch::FrameSink;

/// What a mock reader delivers once opened.
#[derive(Debug, Clone)]
pub enum MockFeed {
    /// Opens a reader that never delivers; tests drive the session directly.
    Idle,
    /// Synthetic frames at a fixed interval, optionally bounded.
    Synthetic {
        frames: Option<u64>,
        interval: Duration,
    },
    /// Replays the given arrivals in order; `None` is a closed frame.
    Scripted(Vec<Option<RawFrame>>),
}

/// Mock source with a fixed set of profiles.
#[derive(Debug, Clone)]
pub struct MockSource {
    name: String,
    profiles: Vec<VideoProfile>,
    feed: MockFeed,
}

impl MockSource {
    /// A source with a single profile and an idle feed.
    pub fn new(profile: VideoProfile) -> Self {
        Self {
            name: format!("mock-ir-{}x{}", profile.width, profile.height),
            profiles: vec![profile],
            feed: MockFeed::Idle,
        }
    }

    /// A source advertising no profiles at all.
    pub fn without_profiles() -> Self {
        Self {
            name: "mock-ir-empty".to_string(),
            profiles: Vec::new(),
            feed: MockFeed::Idle,
        }
    }

    pub fn with_feed(mut self, feed: MockFeed) -> Self {
        self.feed = feed;
        self
    }

    /// Generates `frames` synthetic frames `interval` apart.
    pub fn synthetic(mut self, frames: Option<u64>, interval: Duration) -> Self {
        self.feed = MockFeed::Synthetic { frames, interval };
        self
    }

    /// Replays `arrivals` as soon as the reader opens.
    pub fn scripted(mut self, arrivals: Vec<Option<RawFrame>>) -> Self {
        self.feed = MockFeed::Scripted(arrivals);
        self
    }
}

impl FrameSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn available_video_profiles(&self) -> &[VideoProfile] {
        &self.profiles
    }

    fn open_reader(
        &mut self,
        profile: &VideoProfile,
        sink: FrameSink,
    ) -> Result<Box<dyn FrameReader>, SourceError> {
        if !self.profiles.contains(profile) {
            return Err(SourceError::OpenFailed(format!(
                "{} does not support {}x{}",
                self.name, profile.width, profile.height
            )));
        }

        tracing::info!(source = %self.name, ?profile, "MockSource reader opened");

        match self.feed.clone() {
            MockFeed::Idle => Ok(Box::new(IdleReader { open: true })),
            MockFeed::Synthetic { frames, interval } => {
                let (width, height) = (profile.width, profile.height);
                let reader = ThreadReader::spawn("mock-ir-reader", move |stop| {
                    let mut sequence = 0u64;
                    while !stop.load(Ordering::Acquire) && frames.map_or(true, |n| sequence < n) {
                        sequence += 1;
                        let frame = synthetic_frame(width, height, sequence);
                        if !sink.deliver(FrameArrival::new(frame)) {
                            break;
                        }
                        std::thread::sleep(interval);
                    }
                    tracing::debug!(delivered = sequence, "Synthetic feed finished");
                })?;
                Ok(Box::new(reader))
            }
            MockFeed::Scripted(arrivals) => {
                let reader = ThreadReader::spawn("mock-ir-reader", move |stop| {
                    for arrival in arrivals {
                        if stop.load(Ordering::Acquire) {
                            break;
                        }
                        let event = arrival.map_or_else(FrameArrival::closed, FrameArrival::new);
                        if !sink.deliver(event) {
                            break;
                        }
                    }
                })?;
                Ok(Box::new(reader))
            }
        }
    }
}

/// Reader that is open but never delivers.
#[derive(Debug)]
struct IdleReader {
    open: bool,
}

impl FrameReader for IdleReader {
    fn is_active(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Mock provider handing out a fixed list of sources.
#[derive(Debug, Clone)]
pub struct MockProvider {
    access: AccessStatus,
    sources: Vec<MockSource>,
}

impl MockProvider {
    /// A provider that allows access and has no sources.
    pub fn new() -> Self {
        Self {
            access: AccessStatus::Allowed,
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: MockSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Makes every permission request fail.
    pub fn denied(mut self) -> Self {
        self.access = AccessStatus::Denied;
        self
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSourceProvider for MockProvider {
    fn request_access(&mut self) -> AccessStatus {
        self.access
    }

    fn find_all_sources(&mut self) -> Result<Vec<Box<dyn FrameSource>>, SourceError> {
        Ok(self
            .sources
            .iter()
            .cloned()
            .map(|s| Box::new(s) as Box<dyn FrameSource>)
            .collect())
    }
}

/// Builds a deterministic synthetic frame.
///
/// The low byte follows a pattern mixed with the sequence number; the
/// high byte cycles so that reductions which read it produce visibly
/// different output. NOT sensor data.
pub fn synthetic_frame(width: u32, height: u32, sequence: u64) -> RawFrame {
    let pixel_count = (width as usize) * (height as usize);
    let samples: Vec<u16> = (0..pixel_count)
        .map(|i| {
            let low = ((i as u64 ^ sequence) % 256) as u16;
            let high = (sequence % 4) as u16;
            (high << 8) | low
        })
        .collect();
    RawFrame::from_samples(&samples, width, height, sequence)
}

//! Hardware frame source backed by `nokhwa`.
//!
//! Infrared sensors exposed as UVC devices stream an 8-bit luma plane.
//! Each luma value is widened into the low byte of a 16-bit sample so the
//! rest of the pipeline sees the same format as a perception sensor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nokhwa::pixel_format::LumaFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};

use super::frame::{FrameArrival, RawFrame};
use super::source::{
    AccessStatus, FrameReader, FrameSource, FrameSourceProvider, SourceError, ThreadReader,
    VideoProfile,
};
use crate::dispatch::FrameSink;

fn requested_format() -> RequestedFormat<'static> {
    RequestedFormat::new::<LumaFormat>(RequestedFormatType::AbsoluteHighestFrameRate)
}

/// Provider enumerating the platform's camera devices.
#[derive(Debug, Default)]
pub struct NativeProvider;

impl NativeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSourceProvider for NativeProvider {
    fn request_access(&mut self) -> AccessStatus {
        if nokhwa::nokhwa_check() {
            AccessStatus::Allowed
        } else {
            AccessStatus::Denied
        }
    }

    fn find_all_sources(&mut self) -> Result<Vec<Box<dyn FrameSource>>, SourceError> {
        let devices = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| SourceError::DiscoveryFailed(e.to_string()))?;

        let mut sources: Vec<Box<dyn FrameSource>> = Vec::new();
        for info in devices {
            let index = info.index().clone();
            match probe_profile(&index) {
                Ok(profile) => {
                    tracing::info!(device = %info.human_name(), ?profile, "Found camera");
                    sources.push(Box::new(NativeSource {
                        name: info.human_name(),
                        index,
                        profiles: vec![profile],
                    }));
                }
                Err(e) => {
                    tracing::warn!(device = %info.human_name(), error = %e, "Skipping camera");
                }
            }
        }
        Ok(sources)
    }
}

/// Opens the device briefly to learn the resolution it negotiates.
fn probe_profile(index: &CameraIndex) -> Result<VideoProfile, NokhwaError> {
    let camera = Camera::new(index.clone(), requested_format())?;
    let resolution = camera.resolution();
    Ok(VideoProfile::new(
        resolution.width(),
        resolution.height(),
        camera.frame_rate(),
    ))
}

/// A single camera device.
pub struct NativeSource {
    name: String,
    index: CameraIndex,
    profiles: Vec<VideoProfile>,
}

impl FrameSource for NativeSource {
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
        let index = self.index.clone();
        let name = self.name.clone();
        let backoff = FrameBackoff::for_profile(profile);
        let reader = ThreadReader::spawn("ir-native-reader", move |stop| {
            tracing::info!(device = %name, "Camera stream starting");
            if let Err(e) = stream_frames(index, &stop, &sink, backoff) {
                tracing::error!(device = %name, error = %e, "Camera stream failed");
            }
            tracing::info!(device = %name, "Camera stream stopped");
        })?;
        Ok(Box::new(reader))
    }
}

/// Consecutive frame failures tolerated before the stream gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 30;

/// Pacing for a camera that keeps failing to hand out frames.
#[derive(Debug, Clone, Copy)]
struct FrameBackoff {
    interval: Duration,
    failures: u32,
}

impl FrameBackoff {
    fn for_profile(profile: &VideoProfile) -> Self {
        Self {
            interval: Duration::from_secs(1) / profile.fps.max(1),
            failures: 0,
        }
    }

    fn on_success(&mut self) {
        self.failures = 0;
    }

    /// Delay before the next attempt, or `None` once the limit is reached.
    fn on_failure(&mut self) -> Option<Duration> {
        self.failures += 1;
        (self.failures < MAX_CONSECUTIVE_FAILURES).then_some(self.interval)
    }
}

// `Camera` is not `Send`, so it lives entirely on the reader thread.
fn stream_frames(
    index: CameraIndex,
    stop: &AtomicBool,
    sink: &FrameSink,
    mut backoff: FrameBackoff,
) -> Result<(), NokhwaError> {
    let mut camera = Camera::new(index, requested_format())?;
    camera.open_stream()?;

    let mut sequence = 0u64;
    while !stop.load(Ordering::Acquire) {
        match camera.frame().and_then(|buffer| buffer.decode_image::<LumaFormat>()) {
            Ok(image) => {
                backoff.on_success();
                sequence += 1;
                let frame = widen_luma(image.as_raw(), image.width(), image.height(), sequence);
                if !sink.deliver(FrameArrival::new(frame)) {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, failures = backoff.failures + 1, "Camera frame unavailable");
                if !sink.deliver(FrameArrival::closed()) {
                    break;
                }
                match backoff.on_failure() {
                    Some(delay) => std::thread::sleep(delay),
                    None => {
                        tracing::warn!(
                            failures = MAX_CONSECUTIVE_FAILURES,
                            "Camera keeps failing, stopping stream"
                        );
                        break;
                    }
                }
            }
        }
    }

    camera.stop_stream()?;
    Ok(())
}

fn widen_luma(luma: &[u8], width: u32, height: u32, sequence: u64) -> RawFrame {
    let data = luma.iter().flat_map(|&v| [v, 0]).collect();
    RawFrame::new(data, width, height, sequence)
}

//! Capture, export and mock-source configuration.
//!
//! Everything has a usable default; a TOML file only needs the keys it
//! wants to change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::SampleReduction;

/// Configuration for the capture pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// How a 16-bit infrared sample is reduced to one display byte.
    pub sample_reduction: SampleReduction,
    /// Paint both buffers with solid colours before the first frame.
    pub seed_test_pattern: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_reduction: SampleReduction::LowByte,
            seed_test_pattern: true,
        }
    }
}

impl CaptureConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let SampleReduction::Scaled { max: 0 } = self.sample_reduction {
            return Err(ConfigError::InvalidScale);
        }
        Ok(())
    }
}

/// Where and how saved frames are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Base file name offered for saved frames.
    pub suggested_name: String,
    /// Directory saved frames land in.
    pub output_dir: PathBuf,
    /// Append a local timestamp to each file name.
    pub timestamped: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            suggested_name: "IR_Capture".to_string(),
            output_dir: PathBuf::from("."),
            timestamped: true,
        }
    }
}

/// Synthetic source settings used by the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second to deliver.
    pub fps: u32,
    /// Number of frames before the feed goes quiet.
    pub frames: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            width: 340,
            height: 340,
            fps: 30,
            frames: 60,
        }
    }
}

impl MockConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }

    /// Delay between synthetic frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("scaled sample reduction needs a non-zero max")]
    InvalidScale,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub mock: MockConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.mock.validate()
    }
}

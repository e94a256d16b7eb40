use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::audio_models::{StreamInfo, MAX_CHANNELS};
use super::error::RecorderError;
use crate::processing::sample_window::{FanOut, SampleDepth};

/// Recorder configuration.
///
/// Loadable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfiguration {
    /// Capture device, or None for the system default.
    pub device_id: Option<String>,

    /// Lower bound for the requested recording length (default: 30).
    pub min_recording_secs: u32,

    /// Upper bound for the requested recording length (default: 300).
    pub max_recording_secs: u32,

    /// Recording length used when a start request does not name one (default: 300).
    pub max_duration_secs: u32,

    /// Target sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Encoded channel count (default: 2).
    pub channels: u16,

    /// Encoder quality hint in [-0.1, 1.0] (default: 0.5).
    pub quality: f32,

    /// Per-tick debug traces.
    pub enable_debug: bool,

    /// Where recordings go when no directory is given.
    pub default_save_directory: PathBuf,

    /// Device ring length in seconds. None sizes the ring to the recording length.
    pub device_buffer_secs: Option<u32>,

    /// How device channels map onto encoded channels.
    pub fan_out: FanOut,

    pub sample_depth: SampleDepth,

    /// Write pages from a background thread.
    pub async_writes: bool,

    /// Write a `.metadata.json` sidecar next to file recordings.
    pub write_metadata: bool,

    /// Sleep between ticks when the session drives itself.
    pub tick_interval_ms: u64,
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if !self.quality.is_finite() || !(-0.1..=1.0).contains(&self.quality) {
            return Err(format!("quality {} outside [-0.1, 1.0]", self.quality));
        }
        if self.min_recording_secs == 0 {
            return Err("minimum recording length must be positive".into());
        }
        if self.min_recording_secs > self.max_recording_secs {
            return Err(format!(
                "minimum recording length {}s exceeds maximum {}s",
                self.min_recording_secs, self.max_recording_secs
            ));
        }
        if self.device_buffer_secs == Some(0) {
            return Err("device buffer length must be positive".into());
        }
        if self.tick_interval_ms == 0 {
            return Err("tick interval must be positive".into());
        }
        Ok(())
    }

    /// Requested length clamped to `[min_recording_secs, max_recording_secs]`.
    pub fn clamped_duration(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.max_duration_secs)
            .clamp(self.min_recording_secs, self.max_recording_secs)
    }

    pub fn stream_info(&self, sample_rate: u32) -> Result<StreamInfo, RecorderError> {
        StreamInfo::new(self.channels, sample_rate, self.quality)
    }

    pub fn from_json(json: &str) -> Result<Self, RecorderError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RecorderError::Configuration(format!("failed to parse configuration: {}", e)))?;
        config.validate().map_err(RecorderError::Configuration)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, RecorderError> {
        let json = fs::read_to_string(path)
            .map_err(|e| RecorderError::IoFailure(format!("failed to read configuration: {}", e)))?;
        Self::from_json(&json)
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            device_id: None,
            min_recording_secs: 30,
            max_recording_secs: 300,
            max_duration_secs: 300,
            sample_rate: 48000,
            channels: 2,
            quality: 0.5,
            enable_debug: false,
            default_save_directory: std::env::temp_dir().join("Recordings"),
            device_buffer_secs: None,
            fan_out: FanOut::Replicate,
            sample_depth: SampleDepth::Float,
            async_writes: true,
            write_metadata: false,
            tick_interval_ms: 16,
        }
    }
}

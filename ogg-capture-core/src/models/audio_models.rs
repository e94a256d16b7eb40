use ogg_vorbis_codec::VorbisInfo;
use serde::{Deserialize, Serialize};

use super::error::RecorderError;

/// Largest channel count a recording may request.
pub const MAX_CHANNELS: u16 = 8;

/// Encoder stream parameters. Immutable once a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub channels: u16,
    pub sample_rate: u32,
    /// Quality hint in `[-0.1, 1.0]`.
    pub quality: f32,
}

impl StreamInfo {
    pub fn new(channels: u16, sample_rate: u32, quality: f32) -> Result<Self, RecorderError> {
        let info = Self {
            channels,
            sample_rate,
            quality,
        };
        info.validate().map_err(RecorderError::Configuration)?;
        Ok(info)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(format!(
                "unsupported channel count: {} (1..={})",
                self.channels, MAX_CHANNELS
            ));
        }
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if !self.quality.is_finite() || !(-0.1..=1.0).contains(&self.quality) {
            return Err(format!("quality {} outside [-0.1, 1.0]", self.quality));
        }
        Ok(())
    }

    pub(crate) fn vorbis_info(&self) -> Result<VorbisInfo, RecorderError> {
        Ok(VorbisInfo::new(
            usize::from(self.channels),
            self.sample_rate,
            self.quality,
        )?)
    }
}

/// A finished in-memory recording, interleaved by frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioClip {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / usize::from(self.channels)
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / f64::from(self.sample_rate)
        }
    }

    /// Samples of one channel, de-interleaved.
    pub fn channel(&self, index: u16) -> Vec<f32> {
        if index >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(usize::from(index))
            .step_by(usize::from(self.channels))
            .copied()
            .collect()
    }
}

/// A capture device that can be recorded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Supported capture frequencies. Both zero means any rate is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCaps {
    pub min_frequency: u32,
    pub max_frequency: u32,
}

impl DeviceCaps {
    pub fn supports(&self, sample_rate: u32) -> bool {
        if self.min_frequency == 0 && self.max_frequency == 0 {
            return true;
        }
        (self.min_frequency..=self.max_frequency).contains(&sample_rate)
    }
}

/// A started capture on a device.
///
/// The device writes `buffer_frames` frames of `channels` interleaved
/// samples into a ring, reporting its write position in frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub id: u64,
    pub device_id: Option<String>,
    pub buffer_frames: usize,
    pub channels: u16,
    pub sample_rate: u32,
}

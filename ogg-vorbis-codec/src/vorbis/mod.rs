//! A compact Vorbis I encoder.
//!
//! Every block is 256 samples long (hop of 128), so the stream uses a single
//! mode, a single floor 1 and a single residue 1 configuration. The setup
//! header carries two codebooks: a one-bit book used for residue
//! classification and floor subclass values, and a scalar book covering the
//! quantized residue range `-16..=16`.

mod analysis;
pub mod codebook;
mod floor;
pub mod header;
mod mdct;
mod residue;

pub use analysis::AnalysisState;
pub use header::Comments;

use crate::error::CodecError;

/// log2 of the block size written to the identification header.
pub const BLOCKSIZE_EXPONENT: u32 = 8;

/// Samples per block.
pub const BLOCK_SIZE: usize = 1 << BLOCKSIZE_EXPONENT;

/// Samples per packet once the stream is running.
pub const HOP: usize = BLOCK_SIZE / 2;

/// Largest absolute residue value the scalar codebook can express.
pub const MAX_RESIDUE: i32 = 16;

pub const MAX_CHANNELS: usize = 255;

/// Immutable stream parameters; these fully determine the header packets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VorbisInfo {
    channels: usize,
    sample_rate: u32,
    quality: f32,
}

impl VorbisInfo {
    pub fn new(channels: usize, sample_rate: u32, quality: f32) -> Result<Self, CodecError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(CodecError::InvalidInfo(format!(
                "channel count {} outside 1..={}",
                channels, MAX_CHANNELS
            )));
        }
        if sample_rate == 0 {
            return Err(CodecError::InvalidInfo("sample rate must be > 0".into()));
        }
        if !quality.is_finite() || !(-0.1..=1.0).contains(&quality) {
            return Err(CodecError::InvalidInfo(format!(
                "quality {} outside -0.1..=1.0",
                quality
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
            quality,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Number of quantization steps between the floor and the block peak.
    ///
    /// Ranges from 2 at quality -0.1 to [`MAX_RESIDUE`] at quality 1.0.
    pub fn residue_level(&self) -> i32 {
        let t = ((self.quality + 0.1) / 1.1).clamp(0.0, 1.0);
        2 + (t * (MAX_RESIDUE - 2) as f32).round() as i32
    }
}

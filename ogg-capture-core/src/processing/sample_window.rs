use serde::{Deserialize, Serialize};

use crate::models::error::InputError;

/// How device channels are spread over the encoded channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    /// Missing outputs repeat the device channels in order.
    #[default]
    Replicate,
    /// Missing outputs are silent.
    FirstChannel,
}

/// Sample resolution applied before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleDepth {
    #[default]
    Float,
    /// Quantize to 16-bit steps.
    Pcm16,
}

impl SampleDepth {
    fn apply(self, sample: f32) -> f32 {
        match self {
            Self::Float => sample,
            Self::Pcm16 => (sample.clamp(-1.0, 1.0) * 32767.0).round() / 32767.0,
        }
    }
}

/// One slice per channel. All slices must have the same length.
#[derive(Debug, Clone, Copy)]
pub struct SampleChunk<'a> {
    channels: &'a [&'a [f32]],
}

impl<'a> SampleChunk<'a> {
    pub fn new(channels: &'a [&'a [f32]]) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &'a [&'a [f32]] {
        self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames in the chunk, or the first mismatching channel.
    pub fn frames(&self) -> Result<usize, InputError> {
        let expected = self.channels.first().map(|c| c.len()).unwrap_or(0);
        for (channel, data) in self.channels.iter().enumerate() {
            if data.len() != expected {
                return Err(InputError::ChannelLengthMismatch {
                    channel,
                    expected,
                    actual: data.len(),
                });
            }
        }
        Ok(expected)
    }
}

/// Per-tick staging area between the device ring and the encoder.
///
/// The device reads interleaved frames into [`device_buffer`]; [`demux`]
/// then splits them into one stream per encoded channel.
///
/// [`device_buffer`]: SampleWindow::device_buffer
/// [`demux`]: SampleWindow::demux
#[derive(Debug)]
pub struct SampleWindow {
    capacity: usize,
    device_channels: usize,
    fan_out: FanOut,
    depth: SampleDepth,
    raw: Vec<f32>,
    outputs: Vec<Vec<f32>>,
    frames: usize,
}

impl SampleWindow {
    pub fn new(
        capacity: usize,
        device_channels: u16,
        output_channels: u16,
        fan_out: FanOut,
        depth: SampleDepth,
    ) -> Self {
        let device_channels = usize::from(device_channels.max(1));
        Self {
            capacity,
            device_channels,
            fan_out,
            depth,
            raw: vec![0.0; capacity * device_channels],
            outputs: vec![Vec::with_capacity(capacity); usize::from(output_channels)],
            frames: 0,
        }
    }

    /// Largest number of frames one tick can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn output_channels(&self) -> usize {
        self.outputs.len()
    }

    /// Interleaved device buffer for `frames` frames (capped at capacity).
    pub fn device_buffer(&mut self, frames: usize) -> &mut [f32] {
        let frames = frames.min(self.capacity);
        &mut self.raw[..frames * self.device_channels]
    }

    /// Split the first `frames` device frames into the output channels.
    pub fn demux(&mut self, frames: usize) {
        let frames = frames.min(self.capacity);
        let stride = self.device_channels;
        let depth = self.depth;
        let raw = &self.raw[..frames * stride];
        for (index, output) in self.outputs.iter_mut().enumerate() {
            output.clear();
            let source = if index < stride {
                Some(index)
            } else {
                match self.fan_out {
                    FanOut::Replicate => Some(index % stride),
                    FanOut::FirstChannel => None,
                }
            };
            match source {
                Some(source) => output.extend(
                    raw.iter()
                        .skip(source)
                        .step_by(stride)
                        .map(|&s| depth.apply(s)),
                ),
                None => output.resize(frames, 0.0),
            }
        }
        self.frames = frames;
    }

    /// Per-channel views of the current window.
    pub fn channel_slices(&self) -> Vec<&[f32]> {
        self.outputs.iter().map(|c| c.as_slice()).collect()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.outputs.get(index).map(|c| c.as_slice())
    }

    /// The window as interleaved frames.
    pub fn interleaved(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.frames).flat_map(move |frame| self.outputs.iter().map(move |c| c[frame]))
    }

    pub fn clear(&mut self) {
        self.outputs.iter_mut().for_each(Vec::clear);
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_frames_require_equal_lengths() {
        let a = [0.0f32; 100];
        let b = [0.0f32; 99];
        let slices: [&[f32]; 2] = [&a, &b];
        assert_eq!(
            SampleChunk::new(&slices).frames(),
            Err(InputError::ChannelLengthMismatch {
                channel: 1,
                expected: 100,
                actual: 99
            })
        );

        let ok: [&[f32]; 2] = [&a, &a];
        assert_eq!(SampleChunk::new(&ok).frames(), Ok(100));
        assert_eq!(SampleChunk::new(&[]).frames(), Ok(0));
    }

    #[test]
    fn mono_replicates_to_stereo() {
        let mut window = SampleWindow::new(8, 1, 2, FanOut::Replicate, SampleDepth::Float);
        window.device_buffer(3).copy_from_slice(&[0.1, 0.2, 0.3]);
        window.demux(3);

        assert_eq!(window.frames(), 3);
        assert_eq!(window.channel(0), Some(&[0.1, 0.2, 0.3][..]));
        assert_eq!(window.channel(1), Some(&[0.1, 0.2, 0.3][..]));
        let interleaved: Vec<f32> = window.interleaved().collect();
        assert_eq!(interleaved, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn first_channel_silences_extra_outputs() {
        let mut window = SampleWindow::new(4, 1, 3, FanOut::FirstChannel, SampleDepth::Float);
        window.device_buffer(2).copy_from_slice(&[0.5, -0.5]);
        window.demux(2);
        assert_eq!(window.channel(0), Some(&[0.5, -0.5][..]));
        assert_eq!(window.channel(1), Some(&[0.0, 0.0][..]));
        assert_eq!(window.channel(2), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn stereo_device_is_deinterleaved() {
        let mut window = SampleWindow::new(4, 2, 2, FanOut::Replicate, SampleDepth::Float);
        window
            .device_buffer(2)
            .copy_from_slice(&[0.1, -0.1, 0.2, -0.2]);
        window.demux(2);
        assert_eq!(window.channel(0), Some(&[0.1, 0.2][..]));
        assert_eq!(window.channel(1), Some(&[-0.1, -0.2][..]));
    }

    #[test]
    fn pcm16_quantizes_and_clamps() {
        let mut window = SampleWindow::new(2, 1, 1, FanOut::Replicate, SampleDepth::Pcm16);
        window.device_buffer(2).copy_from_slice(&[1.5, 0.123_456]);
        window.demux(2);
        let out = window.channel(0).unwrap();
        approx::assert_relative_eq!(out[0], 1.0);
        approx::assert_abs_diff_eq!(out[1], 0.123_456, epsilon = 1.0 / 32767.0);
    }

    #[test]
    fn requests_are_capped_at_capacity() {
        let mut window = SampleWindow::new(4, 1, 1, FanOut::Replicate, SampleDepth::Float);
        assert_eq!(window.device_buffer(10).len(), 4);
        window.demux(10);
        assert_eq!(window.frames(), 4);
        window.clear();
        assert!(window.is_empty());
    }
}

use crate::models::audio_models::AudioClip;
use crate::processing::sample_window::SampleWindow;

/// Bounded interleaved accumulator for the in-memory copy of a recording.
///
/// Never holds more than `max_frames` frames; anything past the bound is
/// dropped and reported to the caller.
#[derive(Debug)]
pub struct ClipBuffer {
    channels: usize,
    max_frames: usize,
    samples: Vec<f32>,
}

impl ClipBuffer {
    pub fn new(channels: u16, max_frames: usize) -> Self {
        Self {
            channels: usize::from(channels.max(1)),
            max_frames,
            samples: Vec::new(),
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn remaining_frames(&self) -> usize {
        self.max_frames - self.frames()
    }

    pub fn is_full(&self) -> bool {
        self.remaining_frames() == 0
    }

    /// Append the window's frames; returns how many fit.
    pub fn append(&mut self, window: &SampleWindow) -> usize {
        let frames = window.frames().min(self.remaining_frames());
        self.samples
            .extend(window.interleaved().take(frames * self.channels));
        frames
    }

    /// Materialize a clip trimmed to exactly the accepted frames.
    pub fn into_clip(self, name: String, sample_rate: u32) -> AudioClip {
        let mut samples = self.samples;
        samples.shrink_to_fit();
        AudioClip {
            name,
            channels: self.channels as u16,
            sample_rate,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::sample_window::{FanOut, SampleDepth};

    fn window_with(samples: &[f32]) -> SampleWindow {
        let mut window =
            SampleWindow::new(samples.len(), 1, 2, FanOut::Replicate, SampleDepth::Float);
        window.device_buffer(samples.len()).copy_from_slice(samples);
        window.demux(samples.len());
        window
    }

    #[test]
    fn appends_interleaved_frames() {
        let mut clip = ClipBuffer::new(2, 10);
        assert_eq!(clip.append(&window_with(&[0.1, 0.2])), 2);
        let clip = clip.into_clip("take".into(), 8_000);
        assert_eq!(clip.samples, vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(clip.frames(), 2);
    }

    #[test]
    fn never_grows_past_bound() {
        let mut clip = ClipBuffer::new(2, 3);
        assert_eq!(clip.append(&window_with(&[0.1, 0.2])), 2);
        assert_eq!(clip.append(&window_with(&[0.3, 0.4])), 1);
        assert!(clip.is_full());
        assert_eq!(clip.append(&window_with(&[0.5])), 0);

        let clip = clip.into_clip("take".into(), 8_000);
        assert_eq!(clip.samples.len(), 6);
        assert_eq!(clip.channel(0), vec![0.1, 0.2, 0.3]);
    }
}

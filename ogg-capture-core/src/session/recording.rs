use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::encoder::bitstream::BitstreamEncoder;
use crate::models::audio_models::DeviceHandle;
use crate::models::config::RecorderConfiguration;
use crate::models::error::RecorderError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult, StopReason};
use crate::models::state::SessionState;
use crate::processing::clip_buffer::ClipBuffer;
use crate::processing::ring_tracker::{CaptureCursor, RingTracker};
use crate::processing::sample_window::{SampleChunk, SampleWindow};
use crate::session::manager::{ActiveSessionGuard, CancelSignal};
use crate::storage::metadata::write_metadata;
use crate::storage::page_sink::{PageSink, SinkOutput, SinkTarget};
use crate::traits::capture_device::CaptureDevice;

/// Outcome of one [`RecordingSession::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum TickStatus {
    Recording { accepted_frames: u64 },
    Completed(Box<RecordingResult>),
}

/// Everything [`RecordingManager::start`](super::manager::RecordingManager::start)
/// hands over to a running session.
pub(crate) struct SessionParts<D> {
    pub name: String,
    pub device: D,
    pub handle: DeviceHandle,
    pub window: SampleWindow,
    pub clip: ClipBuffer,
    pub encoder: BitstreamEncoder,
    pub sink: Box<dyn PageSink>,
    pub cancel: CancelSignal,
    pub cap_frames: u64,
    pub config: RecorderConfiguration,
    pub started_at: DateTime<Utc>,
    pub guard: ActiveSessionGuard,
}

/// A running capture.
///
/// Each [`tick`](Self::tick) moves newly captured frames from the device
/// ring through the encoder into the sink:
/// ```text
/// [Device ring] → [RingTracker] → [SampleWindow] → [BitstreamEncoder] → [PageSink]
///                                        └→ [ClipBuffer]
/// ```
/// The session stops when the duration cap is reached, the cancel signal
/// is set, or the encoder has finalized. Every exit, including failures
/// and drop, finalizes the stream and closes the sink.
pub struct RecordingSession<D: CaptureDevice> {
    name: String,
    device: D,
    handle: DeviceHandle,
    tracker: RingTracker,
    window: SampleWindow,
    clip: Option<ClipBuffer>,
    encoder: BitstreamEncoder,
    sink: Option<Box<dyn PageSink>>,
    cancel: CancelSignal,
    cap_frames: u64,
    config: RecorderConfiguration,
    started_at: DateTime<Utc>,
    guard: Option<ActiveSessionGuard>,
    ticks: u64,
}

impl<D: CaptureDevice> RecordingSession<D> {
    pub(crate) fn new(parts: SessionParts<D>) -> Self {
        Self {
            name: parts.name,
            device: parts.device,
            handle: parts.handle,
            tracker: RingTracker::new(),
            window: parts.window,
            clip: Some(parts.clip),
            encoder: parts.encoder,
            sink: Some(parts.sink),
            cancel: parts.cancel,
            cap_frames: parts.cap_frames,
            config: parts.config,
            started_at: parts.started_at,
            guard: Some(parts.guard),
            ticks: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames accepted into the stream so far.
    pub fn accepted_frames(&self) -> u64 {
        self.tracker.total_accepted()
    }

    /// Hard ceiling on accepted frames.
    pub fn cap_frames(&self) -> u64 {
        self.cap_frames
    }

    pub fn cursor(&self) -> CaptureCursor {
        self.tracker.cursor()
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.guard.is_none()
    }

    /// Ask the session to stop at the end of its next tick.
    ///
    /// Only acts while Recording; returns true if this call set the signal.
    pub fn cancel(&self) -> bool {
        match &self.guard {
            Some(guard) if guard.state().is_recording() => self.cancel.cancel(),
            _ => false,
        }
    }

    /// Run one poll cycle.
    pub fn tick(&mut self) -> Result<TickStatus, RecorderError> {
        if self.is_finished() {
            return Err(RecorderError::SessionClosed);
        }
        match self.step() {
            Ok(None) => Ok(TickStatus::Recording {
                accepted_frames: self.accepted_frames(),
            }),
            Ok(Some(reason)) => self
                .complete(reason)
                .map(|result| TickStatus::Completed(Box::new(result))),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Tick on the calling thread until the session ends.
    pub fn run(mut self, interval: Duration) -> Result<RecordingResult, RecorderError> {
        loop {
            match self.tick()? {
                TickStatus::Completed(result) => return Ok(*result),
                TickStatus::Recording { .. } => thread::sleep(interval),
            }
        }
    }

    fn step(&mut self) -> Result<Option<StopReason>, RecorderError> {
        let position = self.device.current_write_position(&self.handle)?;
        let poll = self.tracker.poll(position, self.handle.buffer_frames);
        let remaining = self.cap_frames - self.tracker.total_accepted();
        let frames = poll
            .available
            .min(self.window.capacity())
            .min(usize::try_from(remaining).unwrap_or(usize::MAX));

        if frames > 0 {
            let offset = self.tracker.last_position();
            self.device
                .read_into(&self.handle, offset, self.window.device_buffer(frames))?;
            self.window.demux(frames);

            let slices = self.window.channel_slices();
            self.encoder.submit(&SampleChunk::new(&slices))?;
            let sink = self.sink.as_mut().ok_or(RecorderError::SessionClosed)?;
            for page in self.encoder.drain_pages(false) {
                sink.write_page(page)?;
            }

            if let Some(clip) = self.clip.as_mut() {
                clip.append(&self.window);
            }
            self.tracker.commit(frames)?;
        }

        self.ticks += 1;
        if self.config.enable_debug {
            debug!(
                "RecordingSession: '{}' tick {} position {} available {}{} read {} accepted {}/{}",
                self.name,
                self.ticks,
                position,
                poll.available,
                if poll.wrapped { " (wrapped)" } else { "" },
                frames,
                self.tracker.total_accepted(),
                self.cap_frames
            );
        }

        let reason = if self.tracker.total_accepted() >= self.cap_frames {
            Some(StopReason::DurationCap)
        } else if self.cancel.is_cancelled() {
            Some(StopReason::Cancelled)
        } else if self.encoder.is_finished() {
            Some(StopReason::EncoderFinalized)
        } else {
            None
        };
        Ok(reason)
    }

    fn set_state(&self, state: SessionState) {
        if let Some(guard) = &self.guard {
            guard.set_state(state);
        }
    }

    /// Stop the device, finalize the stream and close the sink.
    fn finish_stream(&mut self) -> Result<SinkOutput, RecorderError> {
        if let Err(e) = self.device.stop(&self.handle) {
            warn!("RecordingSession: failed to stop device: {}", e);
        }
        let mut sink = self.sink.take().ok_or(RecorderError::SessionClosed)?;
        if !self.encoder.is_finished() {
            for page in self.encoder.finalize()?.pages {
                sink.write_page(page)?;
            }
        }
        sink.close()
    }

    fn complete(&mut self, reason: StopReason) -> Result<RecordingResult, RecorderError> {
        self.set_state(SessionState::Finalizing);
        let output = match self.finish_stream() {
            Ok(output) => output,
            Err(e) => return Err(self.fail(e)),
        };

        let clip = self
            .clip
            .take()
            .map(|clip| clip.into_clip(self.name.clone(), self.handle.sample_rate))
            .ok_or(RecorderError::SessionClosed)?;
        let metadata = RecordingMetadata::new(&clip, &output, reason, self.started_at);
        if self.config.write_metadata {
            if let SinkTarget::File(path) = &output.target {
                if let Err(e) = write_metadata(&metadata, path) {
                    warn!("RecordingSession: {}", e);
                }
            }
        }

        let result = RecordingResult {
            duration_secs: clip.duration_secs(),
            target: output.target,
            clip,
            stop_reason: reason,
            checksum: output.checksum,
            bytes_written: output.bytes_written,
            metadata,
        };
        info!(
            "RecordingSession: '{}' finished ({:?}), {} frames, {} bytes",
            self.name,
            reason,
            result.clip.frames(),
            result.bytes_written
        );

        if let Some(guard) = self.guard.take() {
            if let Some(delegate) = guard.delegate() {
                delegate.on_clip_recorded(&result);
            }
        }
        Ok(result)
    }

    /// Best-effort cleanup after a failure. Returns the original error.
    fn fail(&mut self, err: RecorderError) -> RecorderError {
        error!("RecordingSession: '{}' failed: {}", self.name, err);
        if self.sink.is_some() {
            self.set_state(SessionState::Finalizing);
            if let Err(e) = self.finish_stream() {
                warn!("RecordingSession: cleanup after failure: {}", e);
            }
        } else if let Err(e) = self.device.stop(&self.handle) {
            warn!("RecordingSession: failed to stop device: {}", e);
        }
        self.clip = None;

        if let Some(guard) = self.guard.take() {
            if let Some(delegate) = guard.delegate() {
                delegate.on_error(&err);
            }
        }
        err
    }
}

impl<D: CaptureDevice + 'static> RecordingSession<D> {
    /// Tick on a dedicated thread until the session ends.
    pub fn spawn(
        self,
        interval: Duration,
    ) -> Result<thread::JoinHandle<Result<RecordingResult, RecorderError>>, RecorderError> {
        thread::Builder::new()
            .name("ogg-recording-session".into())
            .spawn(move || self.run(interval))
            .map_err(|e| RecorderError::IoFailure(format!("failed to spawn session thread: {}", e)))
    }
}

impl<D: CaptureDevice> Drop for RecordingSession<D> {
    fn drop(&mut self) {
        if !self.is_finished() {
            warn!("RecordingSession: '{}' dropped while active, finalizing", self.name);
            let _ = self.complete(StopReason::Dropped);
        }
    }
}

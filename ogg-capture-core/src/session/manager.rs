use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use parking_lot::Mutex;

use crate::encoder::bitstream::BitstreamEncoder;
use crate::models::audio_models::StreamInfo;
use crate::models::config::RecorderConfiguration;
use crate::models::error::RecorderError;
use crate::models::state::SessionState;
use crate::processing::clip_buffer::ClipBuffer;
use crate::processing::sample_window::SampleWindow;
use crate::session::recording::{RecordingSession, SessionParts};
use crate::storage::page_sink::{FilePageSink, MemoryPageSink, PageSink, ThreadedPageSink};
use crate::traits::capture_device::CaptureDevice;
use crate::traits::recording_delegate::RecordingDelegate;

/// Shared cancellation flag, set at most once.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this call set the flag.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where a session's pages go.
pub enum Destination {
    /// `name.ogg` in the configured default save directory.
    Default,
    /// `name.ogg` in this directory.
    Directory(PathBuf),
    Memory,
    Sink(Box<dyn PageSink>),
}

/// Parameters for [`RecordingManager::start`]. Unset fields fall back to
/// the manager's configuration.
pub struct StartRequest {
    pub name: Option<String>,
    pub destination: Destination,
    pub max_duration_secs: Option<u32>,
    pub sample_rate: Option<u32>,
    pub cancel: Option<CancelSignal>,
}

impl Default for StartRequest {
    fn default() -> Self {
        Self {
            name: None,
            destination: Destination::Default,
            max_duration_secs: None,
            sample_rate: None,
            cancel: None,
        }
    }
}

impl StartRequest {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn to(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn max_duration(mut self, secs: u32) -> Self {
        self.max_duration_secs = Some(secs);
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn cancel_with(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

struct ManagerShared {
    state: SessionState,
    cancel: Option<CancelSignal>,
    started_at: Option<DateTime<Utc>>,
}

/// Holds the manager's activity slot for one session.
///
/// Dropping it returns the manager to Idle, whichever way the session ended.
pub(crate) struct ActiveSessionGuard {
    shared: Arc<Mutex<ManagerShared>>,
    delegate: Option<Arc<dyn RecordingDelegate>>,
}

impl ActiveSessionGuard {
    pub(crate) fn set_state(&self, state: SessionState) {
        self.shared.lock().state = state;
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(state);
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub(crate) fn delegate(&self) -> Option<&Arc<dyn RecordingDelegate>> {
        self.delegate.as_ref()
    }
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        {
            let mut shared = self.shared.lock();
            shared.state = SessionState::Idle;
            shared.cancel = None;
            shared.started_at = None;
        }
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(SessionState::Idle);
        }
    }
}

/// Owns the recorder's activity state and starts sessions.
///
/// At most one session is active per manager. Clones share the same state.
#[derive(Clone)]
pub struct RecordingManager {
    config: RecorderConfiguration,
    shared: Arc<Mutex<ManagerShared>>,
    delegate: Option<Arc<dyn RecordingDelegate>>,
}

impl RecordingManager {
    pub fn new(config: RecorderConfiguration) -> Result<Self, RecorderError> {
        config.validate().map_err(RecorderError::Configuration)?;
        Ok(Self {
            config,
            shared: Arc::new(Mutex::new(ManagerShared {
                state: SessionState::Idle,
                cancel: None,
                started_at: None,
            })),
            delegate: None,
        })
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn RecordingDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn config(&self) -> &RecorderConfiguration {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().started_at
    }

    /// Start recording from `device`.
    ///
    /// Fails with `DeviceNotReady` before touching any state, and with
    /// `AlreadyBusy` while another session is active. Any later failure
    /// stops the device and leaves the manager Idle.
    pub fn start<D: CaptureDevice>(
        &self,
        mut device: D,
        request: StartRequest,
    ) -> Result<RecordingSession<D>, RecorderError> {
        let device_id = self.config.device_id.as_deref();
        if !device.is_ready(device_id) {
            return Err(RecorderError::DeviceNotReady(
                device_id.unwrap_or("default").to_string(),
            ));
        }

        let cancel = request.cancel.clone().unwrap_or_default();
        let started_at = Utc::now();
        {
            let mut shared = self.shared.lock();
            if shared.state.is_busy() {
                warn!(
                    "RecordingManager: start rejected, session already {:?}",
                    shared.state
                );
                return Err(RecorderError::AlreadyBusy);
            }
            shared.state = SessionState::Starting;
            shared.cancel = Some(cancel.clone());
            shared.started_at = Some(started_at);
        }
        let guard = ActiveSessionGuard {
            shared: Arc::clone(&self.shared),
            delegate: self.delegate.clone(),
        };
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(SessionState::Starting);
        }

        let duration_secs = self.config.clamped_duration(request.max_duration_secs);
        let sample_rate = request.sample_rate.unwrap_or(self.config.sample_rate);
        let caps = device.device_caps(device_id)?;
        if !caps.supports(sample_rate) {
            return Err(RecorderError::Configuration(format!(
                "sample rate {} Hz outside device range {}..={} Hz",
                sample_rate, caps.min_frequency, caps.max_frequency
            )));
        }
        let info = self.config.stream_info(sample_rate)?;
        let cap_frames = u64::from(duration_secs) * u64::from(sample_rate);
        let name = request
            .name
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut sink = self.open_sink(request.destination, &name)?;
        let buffer_secs = self.config.device_buffer_secs.unwrap_or(duration_secs);
        let handle = device.start(device_id, true, buffer_secs, sample_rate)?;

        let encoder = match Self::open_stream(&info, &name, &mut *sink) {
            Ok(encoder) => encoder,
            Err(e) => {
                if let Err(stop_err) = device.stop(&handle) {
                    warn!("RecordingManager: failed to stop device: {}", stop_err);
                }
                return Err(e);
            }
        };

        info!(
            "RecordingManager: recording '{}' to {} ({}s, {} Hz, {} ch from {} device ch)",
            name,
            sink.describe(),
            duration_secs,
            sample_rate,
            info.channels,
            handle.channels
        );

        let window = SampleWindow::new(
            sample_rate as usize,
            handle.channels,
            info.channels,
            self.config.fan_out,
            self.config.sample_depth,
        );
        let clip = ClipBuffer::new(info.channels, cap_frames as usize);
        guard.set_state(SessionState::Recording);

        Ok(RecordingSession::new(SessionParts {
            name,
            device,
            handle,
            window,
            clip,
            encoder,
            sink,
            cancel,
            cap_frames,
            config: self.config.clone(),
            started_at,
            guard,
        }))
    }

    /// Ask the active session to stop at its next tick.
    ///
    /// Only acts while Recording; returns true if this call set the signal.
    pub fn end_recording(&self) -> bool {
        let shared = self.shared.lock();
        match (&shared.cancel, shared.state) {
            (Some(cancel), SessionState::Recording) => cancel.cancel(),
            _ => false,
        }
    }

    fn open_sink(
        &self,
        destination: Destination,
        name: &str,
    ) -> Result<Box<dyn PageSink>, RecorderError> {
        let file_name = format!("{}.ogg", name);
        let sink: Box<dyn PageSink> = match destination {
            Destination::Default => Box::new(FilePageSink::create(
                self.config.default_save_directory.join(file_name),
            )?),
            Destination::Directory(dir) => Box::new(FilePageSink::create(dir.join(file_name))?),
            Destination::Memory => Box::new(MemoryPageSink::new()),
            Destination::Sink(sink) => sink,
        };
        if self.config.async_writes {
            Ok(Box::new(ThreadedPageSink::spawn(sink)?))
        } else {
            Ok(sink)
        }
    }

    fn open_stream(
        info: &StreamInfo,
        name: &str,
        sink: &mut dyn PageSink,
    ) -> Result<BitstreamEncoder, RecorderError> {
        let mut encoder = BitstreamEncoder::new(*info)?.with_comment("TITLE", name);
        for page in encoder.open()?.pages {
            sink.write_page(page)?;
        }
        Ok(encoder)
    }
}

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::models::audio_models::{DeviceCaps, DeviceHandle, DeviceInfo};
use crate::models::error::RecorderError;
use crate::traits::capture_device::CaptureDevice;

/// Waveform written by a [`SimulatedDevice`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Silence,
    Sine { frequency: f32, amplitude: f32 },
    /// `(n % period) / period` for absolute frame `n`, identical on every channel.
    Ramp { period: u32 },
}

impl Signal {
    fn sample(&self, frame: u64, sample_rate: u32) -> f32 {
        match *self {
            Self::Silence => 0.0,
            Self::Sine {
                frequency,
                amplitude,
            } => {
                let t = frame as f64 / f64::from(sample_rate.max(1));
                (amplitude as f64 * (2.0 * std::f64::consts::PI * frequency as f64 * t).sin()) as f32
            }
            Self::Ramp { period } => {
                let period = u64::from(period.max(1));
                (frame % period) as f32 / period as f32
            }
        }
    }
}

#[derive(Debug)]
struct SimState {
    ready: bool,
    running: bool,
    looping: bool,
    handle_id: Option<u64>,
    sample_rate: u32,
    ring: Vec<f32>,
    buffer_frames: usize,
    position: usize,
    generated: u64,
    fail_reads: usize,
    signal: Signal,
    auto_advance: Option<usize>,
}

impl SimState {
    /// Write `frames` frames of the signal at the write position.
    fn advance(&mut self, channels: usize, frames: usize) {
        if !self.running || self.buffer_frames == 0 {
            return;
        }
        let frames = if self.looping {
            frames
        } else {
            let left = (self.buffer_frames as u64).saturating_sub(self.generated);
            frames.min(left as usize)
        };
        for _ in 0..frames {
            let value = self.signal.sample(self.generated, self.sample_rate);
            let start = self.position * channels;
            self.ring[start..start + channels].fill(value);
            self.position = (self.position + 1) % self.buffer_frames;
            self.generated += 1;
        }
    }
}

/// In-memory capture device with a looping ring and a signal generator.
///
/// Nothing is written until [`SimulatedDeviceControl::advance`] is called,
/// or, with [`with_auto_advance`](Self::with_auto_advance), every time the
/// write position is queried. The second mode lets a tick loop run
/// deterministically without a real clock.
pub struct SimulatedDevice {
    info: DeviceInfo,
    caps: DeviceCaps,
    channels: u16,
    next_handle: u64,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDevice {
    pub fn new(channels: u16) -> Self {
        Self {
            info: DeviceInfo {
                id: "simulated".into(),
                name: "Simulated Input".into(),
                is_default: true,
            },
            caps: DeviceCaps::default(),
            channels: channels.max(1),
            next_handle: 1,
            state: Arc::new(Mutex::new(SimState {
                ready: true,
                running: false,
                looping: true,
                handle_id: None,
                sample_rate: 0,
                ring: Vec::new(),
                buffer_frames: 0,
                position: 0,
                generated: 0,
                fail_reads: 0,
                signal: Signal::Silence,
                auto_advance: None,
            })),
        }
    }

    pub fn with_signal(self, signal: Signal) -> Self {
        self.state.lock().signal = signal;
        self
    }

    pub fn with_caps(mut self, caps: DeviceCaps) -> Self {
        self.caps = caps;
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.info.id = id.to_string();
        self
    }

    /// Advance by `frames` each time the write position is read.
    pub fn with_auto_advance(self, frames: usize) -> Self {
        self.state.lock().auto_advance = Some(frames);
        self
    }

    pub fn control(&self) -> SimulatedDeviceControl {
        SimulatedDeviceControl {
            channels: usize::from(self.channels),
            state: Arc::clone(&self.state),
        }
    }

    fn knows(&self, device_id: Option<&str>) -> bool {
        device_id.map_or(true, |id| id == self.info.id)
    }

    fn check_handle(state: &SimState, handle: &DeviceHandle) -> Result<(), RecorderError> {
        match state.handle_id {
            Some(id) if id == handle.id && state.running => Ok(()),
            _ => Err(RecorderError::Device(format!(
                "capture handle {} is not active",
                handle.id
            ))),
        }
    }
}

impl CaptureDevice for SimulatedDevice {
    fn list_devices(&self) -> Vec<DeviceInfo> {
        vec![self.info.clone()]
    }

    fn device_caps(&self, device_id: Option<&str>) -> Result<DeviceCaps, RecorderError> {
        if !self.knows(device_id) {
            return Err(RecorderError::Device(format!(
                "unknown device: {}",
                device_id.unwrap_or_default()
            )));
        }
        Ok(self.caps)
    }

    fn is_ready(&self, device_id: Option<&str>) -> bool {
        self.knows(device_id) && self.state.lock().ready
    }

    fn start(
        &mut self,
        device_id: Option<&str>,
        looping: bool,
        duration_secs: u32,
        sample_rate: u32,
    ) -> Result<DeviceHandle, RecorderError> {
        if !self.is_ready(device_id) {
            return Err(RecorderError::DeviceNotReady(
                device_id.unwrap_or(self.info.id.as_str()).to_string(),
            ));
        }
        if !self.caps.supports(sample_rate) {
            return Err(RecorderError::Device(format!(
                "sample rate {} Hz not supported",
                sample_rate
            )));
        }
        let buffer_frames = duration_secs as usize * sample_rate as usize;
        if buffer_frames == 0 {
            return Err(RecorderError::Device("capture buffer would be empty".into()));
        }

        let id = self.next_handle;
        self.next_handle += 1;
        let channels = usize::from(self.channels);
        {
            let mut state = self.state.lock();
            state.running = true;
            state.looping = looping;
            state.handle_id = Some(id);
            state.sample_rate = sample_rate;
            state.ring = vec![0.0; buffer_frames * channels];
            state.buffer_frames = buffer_frames;
            state.position = 0;
            state.generated = 0;
        }
        debug!(
            "SimulatedDevice: started handle {} ({} frames, {} ch, looping: {})",
            id, buffer_frames, channels, looping
        );

        Ok(DeviceHandle {
            id,
            device_id: device_id.map(str::to_string),
            buffer_frames,
            channels: self.channels,
            sample_rate,
        })
    }

    fn current_write_position(&self, handle: &DeviceHandle) -> Result<usize, RecorderError> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        if let Some(frames) = state.auto_advance {
            state.advance(usize::from(self.channels), frames);
        }
        Ok(state.position)
    }

    fn read_into(
        &mut self,
        handle: &DeviceHandle,
        offset: usize,
        buf: &mut [f32],
    ) -> Result<(), RecorderError> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(RecorderError::Device("simulated read failure".into()));
        }

        let ring_len = state.ring.len();
        let start = (offset % state.buffer_frames) * usize::from(self.channels);
        if buf.len() > ring_len {
            return Err(RecorderError::Device(format!(
                "read of {} samples exceeds ring of {}",
                buf.len(),
                ring_len
            )));
        }
        let head = buf.len().min(ring_len - start);
        buf[..head].copy_from_slice(&state.ring[start..start + head]);
        let rest = buf.len() - head;
        buf[head..].copy_from_slice(&state.ring[..rest]);
        Ok(())
    }

    fn stop(&mut self, handle: &DeviceHandle) -> Result<(), RecorderError> {
        let mut state = self.state.lock();
        if state.handle_id != Some(handle.id) {
            return Err(RecorderError::Device(format!(
                "unknown capture handle {}",
                handle.id
            )));
        }
        state.running = false;
        Ok(())
    }
}

/// Test-side handle to a [`SimulatedDevice`] that has been moved into a session.
#[derive(Clone)]
pub struct SimulatedDeviceControl {
    channels: usize,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDeviceControl {
    /// Write `frames` more frames of the signal.
    pub fn advance(&self, frames: usize) {
        self.state.lock().advance(self.channels, frames);
    }

    /// Move the write position without writing samples.
    pub fn set_position(&self, position: usize) {
        let mut state = self.state.lock();
        if state.buffer_frames > 0 {
            state.position = position % state.buffer_frames;
        }
    }

    /// Fail the next `count` reads with a device error.
    pub fn fail_reads(&self, count: usize) {
        self.state.lock().fail_reads = count;
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    pub fn position(&self) -> usize {
        self.state.lock().position
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Frames written since the device was started.
    pub fn generated_frames(&self) -> u64 {
        self.state.lock().generated
    }
}

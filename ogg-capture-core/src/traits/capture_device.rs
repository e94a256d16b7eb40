use crate::models::audio_models::{DeviceCaps, DeviceHandle, DeviceInfo};
use crate::models::error::RecorderError;

/// Interface for audio capture devices writing into a looping ring.
///
/// Positions and offsets are in frames. The ring holds
/// `handle.buffer_frames` frames of `handle.channels` interleaved samples;
/// the write position advances monotonically modulo that length.
pub trait CaptureDevice: Send {
    fn list_devices(&self) -> Vec<DeviceInfo>;

    /// Frequency range supported by `device_id` (None = default device).
    fn device_caps(&self, device_id: Option<&str>) -> Result<DeviceCaps, RecorderError>;

    /// Whether the device can be started right now.
    fn is_ready(&self, device_id: Option<&str>) -> bool;

    /// Start capturing into a ring of `duration_secs * sample_rate` frames.
    fn start(
        &mut self,
        device_id: Option<&str>,
        looping: bool,
        duration_secs: u32,
        sample_rate: u32,
    ) -> Result<DeviceHandle, RecorderError>;

    /// Frame index the device will write next.
    fn current_write_position(&self, handle: &DeviceHandle) -> Result<usize, RecorderError>;

    /// Copy frames starting at `offset` into `buf`, wrapping at the ring end.
    fn read_into(
        &mut self,
        handle: &DeviceHandle,
        offset: usize,
        buf: &mut [f32],
    ) -> Result<(), RecorderError>;

    fn stop(&mut self, handle: &DeviceHandle) -> Result<(), RecorderError>;
}

pub mod capture_device;
pub mod recording_delegate;

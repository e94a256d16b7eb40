//! # ogg-capture-core
//!
//! Streaming Ogg Vorbis recorder for looping capture devices.
//!
//! A device writes into a ring buffer; each session tick reads the newly
//! written frames, encodes them incrementally and writes completed Ogg
//! pages to a sink, so the file on disk grows while recording. Capture
//! backends implement the `CaptureDevice` trait and plug into
//! `RecordingManager`.
//!
//! ## Architecture
//!
//! ```text
//! ogg-capture-core (this crate)
//! ├── traits/       ← CaptureDevice, RecordingDelegate
//! ├── models/       ← RecorderError, SessionState, RecorderConfiguration, StreamInfo, etc.
//! ├── processing/   ← RingTracker, SampleWindow, ClipBuffer
//! ├── encoder/      ← BitstreamEncoder (on top of ogg-vorbis-codec)
//! ├── session/      ← RecordingManager, RecordingSession
//! ├── storage/      ← PageSink implementations, metadata sidecar
//! └── device/       ← SimulatedDevice
//! ```

pub mod device;
pub mod encoder;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use device::simulated::{Signal, SimulatedDevice, SimulatedDeviceControl};
pub use encoder::bitstream::{BitstreamEncoder, StreamOutput};
pub use models::audio_models::{AudioClip, DeviceCaps, DeviceHandle, DeviceInfo, StreamInfo};
pub use models::config::RecorderConfiguration;
pub use models::error::{InputError, RecorderError};
pub use models::recording_result::{RecordingMetadata, RecordingResult, StopReason};
pub use models::state::{EncoderState, SessionState};
pub use processing::ring_tracker::{CaptureCursor, PollResult, RingTracker};
pub use processing::sample_window::{FanOut, SampleChunk, SampleDepth, SampleWindow};
pub use session::manager::{CancelSignal, Destination, RecordingManager, StartRequest};
pub use session::recording::{RecordingSession, TickStatus};
pub use storage::page_sink::{FilePageSink, MemoryPageSink, PageSink, SinkOutput, SinkTarget, ThreadedPageSink};
pub use traits::capture_device::CaptureDevice;
pub use traits::recording_delegate::RecordingDelegate;

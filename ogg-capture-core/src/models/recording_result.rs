use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audio_models::AudioClip;
use crate::storage::page_sink::{SinkOutput, SinkTarget};

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    DurationCap,
    Cancelled,
    EncoderFinalized,
    /// The session handle was dropped before it completed.
    Dropped,
}

/// Result returned when a recording session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub target: SinkTarget,
    pub clip: AudioClip,
    pub duration_secs: f64,
    pub stop_reason: StopReason,
    pub checksum: String,
    pub bytes_written: u64,
    pub metadata: RecordingMetadata,
}

impl RecordingResult {
    pub fn file_path(&self) -> Option<&Path> {
        match &self.target {
            SinkTarget::File(path) => Some(path),
            _ => None,
        }
    }

    /// Encoded bytes for in-memory recordings.
    pub fn encoded(&self) -> Option<&[u8]> {
        match &self.target {
            SinkTarget::Memory(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Metadata stored alongside a recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub name: String,
    pub file_path: Option<String>,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
    pub checksum: String,
    pub bytes_written: u64,
    pub stop_reason: StopReason,
    pub started_at: String,
    pub finished_at: String,
}

impl RecordingMetadata {
    pub fn new(
        clip: &AudioClip,
        output: &SinkOutput,
        stop_reason: StopReason,
        started_at: DateTime<Utc>,
    ) -> Self {
        let file_path = match &output.target {
            SinkTarget::File(path) => Some(path.to_string_lossy().into_owned()),
            _ => None,
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: clip.name.clone(),
            file_path,
            duration_secs: clip.duration_secs(),
            sample_rate: clip.sample_rate,
            channels: clip.channels,
            frames: clip.frames() as u64,
            checksum: output.checksum.clone(),
            bytes_written: output.bytes_written,
            stop_reason,
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn metadata_describes_clip_and_output() {
        let clip = AudioClip {
            name: "take".into(),
            channels: 2,
            sample_rate: 8_000,
            samples: vec![0.0; 16_000],
        };
        let output = SinkOutput {
            target: SinkTarget::File(PathBuf::from("/tmp/take.ogg")),
            bytes_written: 1234,
            checksum: "abc".into(),
        };
        let meta = RecordingMetadata::new(&clip, &output, StopReason::Cancelled, Utc::now());

        assert_eq!(meta.frames, 8_000);
        assert_eq!(meta.file_path.as_deref(), Some("/tmp/take.ogg"));
        approx::assert_relative_eq!(meta.duration_secs, 1.0);

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"stop_reason\":\"cancelled\""));
    }
}

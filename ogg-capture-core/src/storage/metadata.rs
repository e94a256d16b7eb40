use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar path for a recording: `take.ogg` → `take.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, RecorderError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| RecorderError::IoFailure(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| RecorderError::IoFailure(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, RecorderError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| RecorderError::IoFailure(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| RecorderError::IoFailure(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording_result::StopReason;

    #[test]
    fn sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("take.ogg");
        let metadata = RecordingMetadata {
            id: "id".into(),
            name: "take".into(),
            file_path: Some(recording.to_string_lossy().into_owned()),
            duration_secs: 2.5,
            sample_rate: 48_000,
            channels: 2,
            frames: 120_000,
            checksum: "00ff".into(),
            bytes_written: 4096,
            stop_reason: StopReason::DurationCap,
            started_at: "2026-01-01T00:00:00+00:00".into(),
            finished_at: "2026-01-01T00:00:03+00:00".into(),
        };

        let path = write_metadata(&metadata, &recording).unwrap();
        assert!(path.ends_with("take.metadata.json"));
        assert_eq!(read_metadata(&recording).unwrap(), metadata);
    }

    #[test]
    fn missing_sidecar_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_metadata(&dir.path().join("none.ogg")),
            Err(RecorderError::IoFailure(_))
        ));
    }
}

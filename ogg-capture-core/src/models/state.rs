use serde::{Deserialize, Serialize};

/// Recorder activity state.
///
/// State transitions:
/// ```text
/// idle → starting → recording → finalizing → idle
///           ↓                        ↑
///         idle (start failed)        └── any failure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Starting,
    Recording,
    Finalizing,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// Whether a new session must be rejected.
    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }
}

/// Bitstream encoder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderState {
    Uninitialized,
    HeaderEmitted,
    Streaming,
    Finalized,
}

impl EncoderState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::HeaderEmitted | Self::Streaming)
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}

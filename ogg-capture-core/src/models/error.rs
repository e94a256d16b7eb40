use ogg_vorbis_codec::CodecError;
use thiserror::Error;

/// Caller-side contract violations. Rejected before any state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("channel {channel} has {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("expected {expected} channels, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    #[error("commit of {requested} samples exceeds the {available} reported by the last poll")]
    CommitOverrun { requested: usize, available: usize },
}

/// Errors that can occur while recording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("device not ready: {0}")]
    DeviceNotReady(String),

    #[error("a recording session is already active")]
    AlreadyBusy,

    #[error("I/O failure: {0}")]
    IoFailure(String),

    #[error("stream already finalized")]
    StreamAlreadyFinalized,

    #[error("encoder has not been opened")]
    EncoderNotOpen,

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("session already closed")]
    SessionClosed,
}

impl From<CodecError> for RecorderError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::ChannelCountMismatch { expected, actual } => {
                InputError::ChannelCountMismatch { expected, actual }.into()
            }
            CodecError::ChannelLengthMismatch {
                channel,
                expected,
                actual,
            } => InputError::ChannelLengthMismatch {
                channel,
                expected,
                actual,
            }
            .into(),
            CodecError::EndOfStream | CodecError::StreamFinished => Self::StreamAlreadyFinalized,
            CodecError::InvalidInfo(msg) => Self::Configuration(msg),
            other => Self::Encoding(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_map_onto_recorder_taxonomy() {
        let err: RecorderError = CodecError::ChannelLengthMismatch {
            channel: 1,
            expected: 100,
            actual: 99,
        }
        .into();
        assert!(matches!(
            err,
            RecorderError::InvalidInput(InputError::ChannelLengthMismatch { actual: 99, .. })
        ));
        assert_eq!(
            RecorderError::from(CodecError::StreamFinished),
            RecorderError::StreamAlreadyFinalized
        );
        assert!(matches!(
            RecorderError::from(CodecError::CorruptPage("x".into())),
            RecorderError::Encoding(_)
        ));
    }
}

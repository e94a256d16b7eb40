use thiserror::Error;

/// Errors raised by the packet and page primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid stream info: {0}")]
    InvalidInfo(String),

    #[error("expected {expected} channels, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    #[error("channel {channel} has {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("end of stream already written")]
    EndOfStream,

    #[error("ogg stream already finished")]
    StreamFinished,

    #[error("invalid codebook: {0}")]
    InvalidCodebook(String),

    #[error("corrupt page: {0}")]
    CorruptPage(String),
}

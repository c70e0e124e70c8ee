//! Codec error types.

use thiserror::Error;

/// Codec error type.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Serializing the value failed
    #[error("Encode error ({codec}): {reason}")]
    Encode { codec: &'static str, reason: String },

    /// Input was not produced by this codec
    #[error("Decode error ({codec}): {reason}")]
    Decode { codec: &'static str, reason: String },

    #[error("Unknown codec: {0}")]
    UnknownCodec(String),
}

impl CodecError {
    pub(crate) fn encode(codec: &'static str, reason: impl ToString) -> Self {
        CodecError::Encode {
            codec,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(codec: &'static str, reason: impl ToString) -> Self {
        CodecError::Decode {
            codec,
            reason: reason.to_string(),
        }
    }

    /// Stable snake_case kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CodecError::Encode { .. } => "encode_error",
            CodecError::Decode { .. } => "decode_error",
            CodecError::UnknownCodec(_) => "unknown_codec",
        }
    }
}

/// Result type alias using CodecError.
pub type CodecResult<T> = Result<T, CodecError>;

//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while parsing instructions or decoding messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The instruction string was empty.
    #[error("no value")]
    EmptyInstruction,

    /// The instruction did not match `verb:path[:newpath]`.
    #[error("malformed instruction {0:?}")]
    MalformedInstruction(String),

    /// The verb is not one of put, patch, delete, copy, move.
    #[error("unknown type {0}")]
    UnknownVerb(String),

    /// Inline content could not be decoded.
    #[error("invalid base64 content: {0}")]
    InvalidContent(#[from] base64::DecodeError),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(ProtocolError::EmptyInstruction.to_string(), "no value");
        assert_eq!(
            ProtocolError::UnknownVerb("chmod".into()).to_string(),
            "unknown type chmod"
        );
        assert!(ProtocolError::MalformedInstruction("put".into())
            .to_string()
            .contains("\"put\""));
    }
}

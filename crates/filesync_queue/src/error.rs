//! Error types for the delay queue.

use filesync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors raised by a queue backend.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Redis command or connection failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Operation could not be serialized.
    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),
}

impl QueueError {
    /// Returns true if the backing store may recover on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Redis(_))
    }
}

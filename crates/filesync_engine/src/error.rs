//! Error types for delivery.

use filesync_protocol::ProtocolError;
use filesync_queue::QueueError;
use thiserror::Error;

/// Result type for delivery operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while delivering an operation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The call did not finish within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// Peer answered with a non-200 HTTP status.
    #[error("status {0} != 200")]
    Status(u16),

    /// Peer received the operation but did not apply it.
    #[error("status code {status_code} != 200: {status_text}")]
    Rejected {
        /// Application status from the peer.
        status_code: u16,
        /// Peer's error message.
        status_text: String,
    },

    /// Message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Retry queue failure.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Certificate material missing or unusable.
    #[error("tls error: {0}")]
    Tls(String),
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { .. }
            | SyncError::Timeout
            | SyncError::Status(_)
            | SyncError::Rejected { .. } => true,
            SyncError::Queue(e) => e.is_retryable(),
            SyncError::Protocol(_) | SyncError::Tls(_) => false,
        }
    }
}

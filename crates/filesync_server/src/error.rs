//! Error types for the server.

use filesync_engine::SyncError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while starting or running the listeners.
#[derive(Error, Debug)]
pub enum ServerError {
    /// TLS material could not be turned into a server configuration.
    #[error("tls error: {0}")]
    Tls(String),

    /// Certificate source failed.
    #[error(transparent)]
    Material(#[from] SyncError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

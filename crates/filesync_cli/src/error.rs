//! Error types for the command-line node.

use filesync_core::CoreError;
use filesync_engine::SyncError;
use filesync_protocol::ProtocolError;
use filesync_queue::QueueError;
use filesync_server::ServerError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file could not be read.
    #[error("reading config {}: {source}", .path.display())]
    ConfigRead {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("parsing config {}: {source}", .path.display())]
    ConfigParse {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration is inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Operation could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Instruction or filesystem failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Delivery failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Queue backend failure.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Listener failure.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Local file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be installed.
    #[error("failed to install tracing subscriber: {0}")]
    Logging(String),

    /// Output could not be encoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation was dropped after its last attempt.
    #[error("operation abandoned after {attempts} attempts")]
    Abandoned {
        /// Failed attempts.
        attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CliError::Abandoned { attempts: 5 };
        assert_eq!(err.to_string(), "operation abandoned after 5 attempts");

        let err = CliError::InvalidConfig("queue.batch_size must be positive".into());
        assert_eq!(
            err.to_string(),
            "invalid config: queue.batch_size must be positive"
        );
    }
}

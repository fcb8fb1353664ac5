//! Error types for source resolution and execution.

use filesync_protocol::{ProtocolError, Verb};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// How an error should be treated by whoever called the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad instruction, path or content. Never retried.
    Input,
    /// Existence precondition violated and `force` not set. Never retried.
    Precondition,
    /// Delete/move target already absent. Retried until the cap is exceeded.
    IdempotentMiss,
    /// Filesystem failure.
    Io,
}

/// Errors raised while resolving or applying an operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Instruction or message could not be parsed or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Path is absolute, empty or climbs out of its root.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// Offending path as received.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Copy or move without a second path.
    #[error("{0} requires a new file name")]
    MissingNewPath(Verb),

    /// Source file does not exist.
    #[error("file {} not found", .0.display())]
    SourceNotFound(PathBuf),

    /// Path points at a directory where a file is required.
    #[error("{} is directory", .0.display())]
    IsDirectory(PathBuf),

    /// Path exists but is not a regular file.
    #[error("{} is not a regular file", .0.display())]
    NotRegularFile(PathBuf),

    /// Put on an existing file without `force`.
    #[error("file {} must not exist", .0.display())]
    MustNotExist(PathBuf),

    /// Patch on a missing file without `force`.
    #[error("file {} must exist", .0.display())]
    MustExist(PathBuf),

    /// Delete or move target is absent.
    #[error("{} not exists", .0.display())]
    NotFound(PathBuf),

    /// I/O failure.
    #[error("{context} {}: {source}", .path.display())]
    Io {
        /// Operation that failed.
        context: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl CoreError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Classifies the error.
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::Protocol(_)
            | CoreError::InvalidPath { .. }
            | CoreError::MissingNewPath(_)
            | CoreError::SourceNotFound(_)
            | CoreError::NotRegularFile(_) => ErrorClass::Input,
            CoreError::IsDirectory(_) | CoreError::MustNotExist(_) | CoreError::MustExist(_) => {
                ErrorClass::Precondition
            }
            CoreError::NotFound(_) => ErrorClass::IdempotentMiss,
            CoreError::Io { .. } => ErrorClass::Io,
        }
    }

    /// Returns true if a later attempt of the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::IdempotentMiss
    }

    /// Application status code reported back to the sender.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Input => 400,
            ErrorClass::Precondition => 409,
            ErrorClass::IdempotentMiss => 404,
            ErrorClass::Io => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let path = PathBuf::from("data/a.txt");
        assert_eq!(
            CoreError::MustNotExist(path.clone()).class(),
            ErrorClass::Precondition
        );
        assert_eq!(
            CoreError::IsDirectory(path.clone()).class(),
            ErrorClass::Precondition
        );
        assert_eq!(
            CoreError::NotFound(path.clone()).class(),
            ErrorClass::IdempotentMiss
        );
        assert_eq!(
            CoreError::SourceNotFound(path.clone()).class(),
            ErrorClass::Input
        );
        assert_eq!(
            CoreError::Protocol(ProtocolError::EmptyInstruction).class(),
            ErrorClass::Input
        );
        assert_eq!(
            CoreError::io("write", path, io::Error::from(io::ErrorKind::PermissionDenied)).class(),
            ErrorClass::Io
        );
    }

    #[test]
    fn only_idempotent_miss_is_retryable() {
        let path = PathBuf::from("a");
        assert!(CoreError::NotFound(path.clone()).is_retryable());
        assert!(!CoreError::MustExist(path.clone()).is_retryable());
        assert!(!CoreError::MissingNewPath(Verb::Copy).is_retryable());
        assert!(!CoreError::io("rename", path, io::Error::from(io::ErrorKind::Other)).is_retryable());
    }

    #[test]
    fn status_codes() {
        let path = PathBuf::from("a");
        assert_eq!(CoreError::MustNotExist(path.clone()).status_code(), 409);
        assert_eq!(CoreError::NotFound(path.clone()).status_code(), 404);
        assert_eq!(CoreError::SourceNotFound(path).status_code(), 400);
    }

    #[test]
    fn display_messages() {
        let err = CoreError::MustNotExist(PathBuf::from("data/a.txt"));
        assert_eq!(err.to_string(), "file data/a.txt must not exist");

        let err = CoreError::MissingNewPath(Verb::Move);
        assert_eq!(err.to_string(), "move requires a new file name");
    }
}

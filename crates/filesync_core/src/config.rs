//! Executor configuration.

use std::path::PathBuf;

/// Retry count above which a missing delete/move target counts as done.
pub const DEFAULT_IDEMPOTENT_RETRY_CAP: u32 = 2;

/// Mode forced on every file written by put or patch.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Configuration for the file operation executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Root every operation path is joined against.
    pub destination_root: PathBuf,
    /// A delete or move whose target is already gone succeeds once the
    /// operation's retry count exceeds this value.
    pub retry_cap: u32,
    /// Final mode of written files.
    pub file_mode: u32,
}

impl ExecutorConfig {
    /// Creates a configuration rooted at `destination_root`.
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: destination_root.into(),
            retry_cap: DEFAULT_IDEMPOTENT_RETRY_CAP,
            file_mode: DEFAULT_FILE_MODE,
        }
    }

    /// Sets the idempotent-miss retry cap.
    pub fn with_retry_cap(mut self, cap: u32) -> Self {
        self.retry_cap = cap;
        self
    }

    /// Sets the final file mode.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new("data")
    }
}

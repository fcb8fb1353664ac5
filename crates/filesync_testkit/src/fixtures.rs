//! Temporary roots for source and destination.

use filesync_core::{ExecutorConfig, FileExecutor, SourceResolver};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A source root and a destination root, removed on drop.
pub struct SyncRoots {
    source: TempDir,
    destination: TempDir,
}

impl SyncRoots {
    /// Creates two empty roots.
    pub fn new() -> Self {
        Self {
            source: TempDir::new().expect("Failed to create source directory"),
            destination: TempDir::new().expect("Failed to create destination directory"),
        }
    }

    /// Source root.
    pub fn source(&self) -> &Path {
        self.source.path()
    }

    /// Destination root.
    pub fn destination(&self) -> &Path {
        self.destination.path()
    }

    /// Writes a file under the source root, creating parent directories.
    pub fn write_source(&self, relative: &str, content: &[u8]) {
        write_under(self.source(), relative, content);
    }

    /// Writes a file under the destination root, creating parent directories.
    pub fn write_destination(&self, relative: &str, content: &[u8]) {
        write_under(self.destination(), relative, content);
    }

    /// Reads a file under the destination root, `None` if absent.
    pub fn read_destination(&self, relative: &str) -> Option<Vec<u8>> {
        fs::read(self.destination().join(relative)).ok()
    }

    /// Resolver over the source root.
    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::new(self.source())
    }

    /// Executor over the destination root with the given idempotent-miss cap.
    pub fn executor(&self, retry_cap: u32) -> FileExecutor {
        FileExecutor::new(ExecutorConfig::new(self.destination()).with_retry_cap(retry_cap))
    }
}

impl Default for SyncRoots {
    fn default() -> Self {
        Self::new()
    }
}

fn write_under(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    fs::write(path, content).expect("Failed to write fixture file");
}

//! File operation executor.
//!
//! Every verb checks the state of its target path before touching it:
//!
//! | Verb   | Requires    | Missing target                  | Existing target          |
//! |--------|-------------|---------------------------------|--------------------------|
//! | put    | NotExists   | write                           | error, or warn + overwrite with `force` |
//! | patch  | ExistsFile  | error, or warn + create with `force` | write               |
//! | delete | ExistsFile  | retryable miss, success past cap | remove                  |
//! | copy   | ExistsFile  | error                           | copy to `new_path`       |
//! | move   | exists      | retryable miss, success past cap | rename to `new_path`    |
//!
//! Writing over a directory always fails.

use crate::config::ExecutorConfig;
use crate::error::{CoreError, CoreResult};
use crate::paths::resolve_relative;
use filesync_protocol::{content_sha256, Operation, SyncResponse, Verb};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};

const DIR_MODE: u32 = 0o777;
const CREATE_MODE: u32 = 0o600;

/// State of a destination path before an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    /// Nothing at the path.
    NotExists,
    /// A regular file (or anything that is not a directory).
    ExistsFile,
    /// A directory.
    ExistsDir,
}

impl PathState {
    /// Inspects `path`.
    pub fn probe(path: &Path) -> CoreResult<Self> {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => Ok(PathState::ExistsDir),
            Ok(_) => Ok(PathState::ExistsFile),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PathState::NotExists),
            Err(e) => Err(CoreError::io("stat", path, e)),
        }
    }
}

/// What an applied operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The filesystem was changed.
    Applied,
    /// The target was already gone and the retry count was past the cap.
    AlreadyApplied,
}

/// Applies operations to a destination root.
#[derive(Debug, Clone)]
pub struct FileExecutor {
    config: ExecutorConfig,
}

impl FileExecutor {
    /// Creates an executor.
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Returns the destination root.
    pub fn root(&self) -> &Path {
        &self.config.destination_root
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Applies one operation.
    pub fn apply(&self, operation: &Operation) -> CoreResult<ApplyOutcome> {
        match operation.verb {
            Verb::Put | Verb::Patch => self.save(operation),
            Verb::Delete => self.delete(operation),
            Verb::Copy => self.copy(operation),
            Verb::Move => self.rename(operation),
        }
    }

    /// Applies one operation and reports the result as a peer acknowledgement.
    pub fn respond(&self, operation: &Operation) -> SyncResponse {
        match self.apply(operation) {
            Ok(_) => SyncResponse::ok(operation),
            Err(e) => {
                warn!(
                    operation = %operation,
                    error = %e,
                    retryable = e.is_retryable(),
                    "operation failed"
                );
                SyncResponse::failed(operation, e.status_code(), e.to_string())
            }
        }
    }

    fn target(&self, relative: &str) -> CoreResult<PathBuf> {
        resolve_relative(&self.config.destination_root, relative)
    }

    fn second_target(&self, operation: &Operation) -> CoreResult<PathBuf> {
        let new_path = operation
            .new_path
            .as_deref()
            .ok_or(CoreError::MissingNewPath(operation.verb))?;
        self.target(new_path)
    }

    fn save(&self, operation: &Operation) -> CoreResult<ApplyOutcome> {
        let path = self.target(&operation.path)?;
        let state = PathState::probe(&path)?;
        debug!(path = %path.display(), ?state, "checking save target");

        match (operation.verb, state) {
            (_, PathState::ExistsDir) => return Err(CoreError::IsDirectory(path)),
            (Verb::Put, PathState::ExistsFile) => {
                let err = CoreError::MustNotExist(path.clone());
                if !operation.force {
                    return Err(err);
                }
                warn!(error = %err, operation = %operation, "forced put over existing file");
            }
            (Verb::Patch, PathState::NotExists) => {
                let err = CoreError::MustExist(path.clone());
                if !operation.force {
                    return Err(err);
                }
                warn!(error = %err, operation = %operation, "forced patch of missing file");
            }
            _ => {}
        }

        let content = operation.decoded_content()?;
        create_parent_dirs(&path)?;
        write_file(&path, &content)?;
        set_mode(&path, self.config.file_mode)?;

        if let Some(expected) = &operation.sha256 {
            let written = fs::read(&path).map_err(|e| CoreError::io("read back", &path, e))?;
            let actual = content_sha256(&written);
            if &actual != expected {
                warn!(
                    operation = %operation,
                    expected = %expected,
                    actual = %actual,
                    "sha256 check failed"
                );
            }
        }

        info!(verb = %operation.verb, path = %path.display(), "{} file", operation.verb);
        Ok(ApplyOutcome::Applied)
    }

    fn delete(&self, operation: &Operation) -> CoreResult<ApplyOutcome> {
        let path = self.target(&operation.path)?;

        match PathState::probe(&path)? {
            PathState::NotExists => return self.missing_target(operation, path),
            PathState::ExistsDir => return Err(CoreError::IsDirectory(path)),
            PathState::ExistsFile => {}
        }

        fs::remove_file(&path).map_err(|e| CoreError::io("remove", &path, e))?;

        info!(verb = %operation.verb, path = %path.display(), "{} file", operation.verb);
        Ok(ApplyOutcome::Applied)
    }

    fn copy(&self, operation: &Operation) -> CoreResult<ApplyOutcome> {
        let source = self.target(&operation.path)?;
        let destination = self.second_target(operation)?;

        let metadata = match fs::metadata(&source) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CoreError::SourceNotFound(source))
            }
            Err(e) => return Err(CoreError::io("stat", source, e)),
        };
        if !metadata.is_file() {
            return Err(CoreError::NotRegularFile(source));
        }
        if PathState::probe(&destination)? == PathState::ExistsDir {
            return Err(CoreError::IsDirectory(destination));
        }

        create_parent_dirs(&destination)?;
        fs::copy(&source, &destination).map_err(|e| CoreError::io("copy", &destination, e))?;

        info!(
            verb = %operation.verb,
            path = %source.display(),
            new_path = %destination.display(),
            "{} file",
            operation.verb
        );
        Ok(ApplyOutcome::Applied)
    }

    fn rename(&self, operation: &Operation) -> CoreResult<ApplyOutcome> {
        let source = self.target(&operation.path)?;
        let destination = self.second_target(operation)?;

        if PathState::probe(&source)? == PathState::NotExists {
            return self.missing_target(operation, source);
        }

        create_parent_dirs(&destination)?;
        fs::rename(&source, &destination).map_err(|e| CoreError::io("rename", &source, e))?;

        info!(
            verb = %operation.verb,
            path = %source.display(),
            new_path = %destination.display(),
            "{} file",
            operation.verb
        );
        Ok(ApplyOutcome::Applied)
    }

    /// A previous attempt may have applied the operation and lost its
    /// acknowledgement; once the retry count is past the cap that is assumed.
    fn missing_target(&self, operation: &Operation, path: PathBuf) -> CoreResult<ApplyOutcome> {
        if operation.retry_count > self.config.retry_cap {
            info!(
                verb = %operation.verb,
                path = %path.display(),
                retry_count = operation.retry_count,
                "target already absent, treating as applied"
            );
            return Ok(ApplyOutcome::AlreadyApplied);
        }
        Err(CoreError::NotFound(path))
    }
}

fn create_parent_dirs(path: &Path) -> CoreResult<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    builder
        .create(parent)
        .map_err(|e| CoreError::io("create directory", parent, e))
}

fn write_file(path: &Path, content: &[u8]) -> CoreResult<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(CREATE_MODE);

    let mut file = options
        .open(path)
        .map_err(|e| CoreError::io("open", path, e))?;
    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| CoreError::io("write", path, e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> CoreResult<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| CoreError::io("chmod", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> CoreResult<()> {
    Ok(())
}

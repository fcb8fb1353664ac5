//! Resolving instructions against the source root.

use crate::error::{CoreError, CoreResult};
use crate::paths::resolve_relative;
use filesync_protocol::{Instruction, Operation};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds operations from instructions, reading put/patch content from disk.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    root: PathBuf,
}

impl SourceResolver {
    /// Creates a resolver reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the source root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parses `value` and resolves it.
    pub fn resolve_str(&self, value: &str) -> CoreResult<Operation> {
        self.resolve(Instruction::parse(value)?)
    }

    /// Resolves a parsed instruction into an operation.
    ///
    /// Put and patch read the source file, attach its base64 content and
    /// SHA-256 digest. Other verbs carry no content. Copy and move without a
    /// second path are rejected here rather than on the peer.
    pub fn resolve(&self, instruction: Instruction) -> CoreResult<Operation> {
        if instruction.verb.requires_new_path() && instruction.new_path.is_none() {
            return Err(CoreError::MissingNewPath(instruction.verb));
        }
        if !instruction.verb.requires_content() {
            return Ok(instruction.into_operation());
        }

        let file_path = resolve_relative(&self.root, &instruction.path)?;
        let metadata = match fs::metadata(&file_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CoreError::SourceNotFound(file_path))
            }
            Err(e) => return Err(CoreError::io("stat", file_path, e)),
        };

        if metadata.is_dir() {
            return Err(CoreError::IsDirectory(file_path));
        }

        let content = fs::read(&file_path).map_err(|e| CoreError::io("read", &file_path, e))?;
        debug!(path = %file_path.display(), bytes = content.len(), "resolved source content");

        Ok(instruction.into_operation().with_content(&content))
    }
}

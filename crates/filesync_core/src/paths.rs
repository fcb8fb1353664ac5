//! Joining relative operation paths against a root.

use crate::error::{CoreError, CoreResult};
use std::path::{Component, Path, PathBuf};

/// Joins `relative` onto `root`, refusing anything that could leave `root`.
pub fn resolve_relative(root: &Path, relative: &str) -> CoreResult<PathBuf> {
    let invalid = |reason| CoreError::InvalidPath {
        path: relative.to_string(),
        reason,
    };

    if relative.is_empty() {
        return Err(invalid("empty path"));
    }

    let candidate = Path::new(relative);
    let mut joined = root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("parent directory reference")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path must be relative"))
            }
        }
    }

    if joined == root {
        return Err(invalid("path resolves to the root itself"));
    }

    Ok(joined)
}

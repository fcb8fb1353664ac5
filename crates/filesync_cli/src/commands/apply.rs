//! Apply an operation to the local destination root.

use crate::config::AppConfig;
use crate::error::CliResult;
use filesync_core::{ApplyOutcome, FileExecutor, SourceResolver};
use filesync_protocol::Operation;
use std::path::Path;
use tracing::info;

/// Where the operation comes from.
#[derive(Debug, Clone)]
pub enum ApplySource<'a> {
    /// Instruction resolved against the source root.
    Instruction {
        /// `verb:path[:newpath]`
        value: &'a str,
        /// Downgrade existence preconditions.
        force: bool,
    },
    /// Wire-format JSON file.
    File(&'a Path),
}

/// Applies one operation without going through a peer.
pub fn run(config: &AppConfig, source: ApplySource<'_>) -> CliResult<ApplyOutcome> {
    let operation = match source {
        ApplySource::Instruction { value, force } => SourceResolver::new(&config.paths.source_dir)
            .resolve_str(value)?
            .with_force(force),
        ApplySource::File(path) => Operation::from_json(&std::fs::read(path)?)?,
    };

    let executor = FileExecutor::new(config.executor_config());
    let outcome = executor.apply(&operation)?;
    info!(verb = %operation.verb, path = %operation.path, ?outcome, "applied locally");
    Ok(outcome)
}

//! # filesync Core
//!
//! Filesystem side of filesync.
//!
//! This crate provides:
//! - [`SourceResolver`]: turns an instruction into an [`Operation`] by reading
//!   content from the source root
//! - [`FileExecutor`]: applies an [`Operation`] to the destination root under
//!   the existence preconditions of its verb
//!
//! ## Key Invariants
//!
//! - Paths are relative and never escape their root
//! - The executor never retries; classification is left to the caller via
//!   [`CoreError::is_retryable`]
//! - A digest mismatch after writing is logged, never returned as an error
//!
//! [`Operation`]: filesync_protocol::Operation

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod executor;
mod paths;
mod source;

pub use config::{ExecutorConfig, DEFAULT_FILE_MODE, DEFAULT_IDEMPOTENT_RETRY_CAP};
pub use error::{CoreError, CoreResult, ErrorClass};
pub use executor::{ApplyOutcome, FileExecutor, PathState};
pub use paths::resolve_relative;
pub use source::SourceResolver;

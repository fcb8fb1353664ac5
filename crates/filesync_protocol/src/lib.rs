//! # filesync Protocol
//!
//! Operation types and wire messages for filesync.
//!
//! This crate provides:
//! - [`Operation`] and [`Verb`], the unit of replication
//! - [`Instruction`], the compact `verb:path[:newpath]` grammar
//! - [`SyncResponse`], the acknowledgement returned by a receiving peer
//! - [`content_sha256`] for integrity annotation
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod hash;
mod instruction;
mod messages;
mod operation;

pub use error::{ProtocolError, ProtocolResult};
pub use hash::content_sha256;
pub use instruction::Instruction;
pub use messages::{SyncResponse, STATUS_OK};
pub use operation::{Operation, Verb};

//! # filesync Testkit
//!
//! Test utilities for filesync.
//!
//! This crate provides:
//! - Temporary source and destination roots
//! - A throwaway PKI (CA plus leaf certificates) for mutual-TLS tests
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use filesync_testkit::prelude::*;
//!
//! #[test]
//! fn copies_between_roots() {
//!     let roots = SyncRoots::new();
//!     roots.write_source("a.txt", b"hello");
//!     // ... resolve and apply
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod pki;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::pki::*;
}

pub use fixtures::*;
pub use generators::*;
pub use pki::*;

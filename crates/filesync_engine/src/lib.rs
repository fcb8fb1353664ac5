//! # filesync Engine
//!
//! Sender side of filesync.
//!
//! This crate provides:
//! - [`SyncTransport`]: carries one operation to a peer and returns its
//!   acknowledgement
//! - [`HttpsTransport`]: JSON over HTTPS with a client certificate, trusting
//!   only the configured root
//! - [`CertificateSource`]: supplies key pair and trust root on demand
//! - [`DeliveryService`]: delivers operations and retries failures, either
//!   through a [`DelayedQueue`] or in-process
//!
//! ## Key Invariants
//!
//! - Success requires both transport success and an application status of 200
//! - Every failure increments `retry_count` before anything else happens
//! - An operation is attempted at most `max_attempts` times, then abandoned
//!
//! [`DelayedQueue`]: filesync_queue::DelayedQueue

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod delivery;
mod error;
mod https;
mod tls;
mod transport;

pub use config::{RetryConfig, TransportConfig, DEFAULT_DESTINATION};
pub use delivery::{DeliveryOutcome, DeliveryService, DeliveryStats, Submission};
pub use error::{SyncError, SyncResult};
pub use https::HttpsTransport;
pub use tls::{CertificateSource, PemFiles, TlsMaterial};
pub use transport::{LoopbackTransport, MockOutcome, MockTransport, SyncTransport};

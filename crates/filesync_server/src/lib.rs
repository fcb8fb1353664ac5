//! # filesync Server
//!
//! Listening side of filesync.
//!
//! This crate provides:
//! - `POST /api/sync` on a mutual-TLS listener: decodes an operation, applies
//!   it with the file executor and answers with a `SyncResponse`
//! - `GET|POST /api/queue` on a plain listener: resolves an instruction from
//!   the source root and submits it for delivery
//! - [`tls_config`]: rustls server configuration that requires and verifies
//!   client certificates against the trust root
//!
//! # Protocol
//!
//! The sync endpoint always answers HTTP 200 once it has decoded an
//! operation; the outcome travels in `statusCode`:
//! 1. 200 applied
//! 2. 400 bad input (path, content, missing new path)
//! 3. 404 delete/move target absent, retry later
//! 4. 409 existence precondition violated
//! 5. 500 filesystem failure

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod tls;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{queue_router, sync_router, QueueParams, ReceiverContext, SenderContext};
pub use server::{serve_plain, serve_tls, SyncServer};
pub use tls::tls_config;

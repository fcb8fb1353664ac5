//! # filesync Queue
//!
//! Delayed retry queue for filesync operations.
//!
//! This crate provides:
//! - [`DelayedQueue`]: pending operations ordered by a not-before timestamp
//! - [`MemoryDelayQueue`]: ordered map under a mutex, for tests and single nodes
//! - [`RedisDelayQueue`]: sorted set, fetch-and-remove in one Lua script
//! - [`QueuePoller`]: fixed-tick loop that hands due operations to an
//!   [`OperationHandler`] one at a time
//!
//! ## Key Invariants
//!
//! - `not_before = now + retry_count * backoff_unit`
//! - An entry is returned by `poll_due` at most once
//! - A malformed entry is skipped, never blocking the rest of its batch
//! - At most one handler invocation runs at a time per poller

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod clock;
mod config;
mod error;
mod memory;
mod poller;
mod queue;
mod redis_queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PollerConfig, QueueConfig, DEFAULT_QUEUE_KEY};
pub use error::{QueueError, QueueResult};
pub use memory::MemoryDelayQueue;
pub use poller::{OperationHandler, QueuePoller};
pub use queue::{DelayedQueue, QueueListing};
pub use redis_queue::RedisDelayQueue;

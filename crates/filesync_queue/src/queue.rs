//! The delayed queue abstraction.

use crate::error::QueueResult;
use async_trait::async_trait;
use filesync_protocol::{Operation, Verb};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// Pending operations ordered by their not-before time.
///
/// Producers only append whole entries; `poll_due` removes exactly the
/// entries it returns, in one atomic step against the backing store.
#[async_trait]
pub trait DelayedQueue: Send + Sync {
    /// Schedules `operation` after its backoff and returns its id,
    /// assigning a fresh one if the operation had none.
    async fn enqueue(&self, operation: Operation) -> QueueResult<String>;

    /// Removes and returns up to `limit` due operations, earliest first.
    async fn poll_due(&self, limit: usize) -> QueueResult<Vec<Operation>>;

    /// Number of pending entries, due or not.
    async fn size(&self) -> QueueResult<usize>;

    /// Returns up to `limit` pending entries, earliest first, without
    /// removing them.
    async fn list(&self, limit: usize) -> QueueResult<Vec<QueueListing>>;

    /// Drops every pending entry and returns how many there were.
    async fn flush(&self) -> QueueResult<usize>;
}

/// Operator view of a pending entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueListing {
    /// Idempotency token.
    pub id: Option<String>,
    /// Target path.
    pub path: String,
    /// Kind of mutation.
    pub verb: Verb,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// Last failure.
    pub last_error: Option<String>,
    /// Due time, Unix milliseconds.
    pub not_before: i64,
}

impl QueueListing {
    pub(crate) fn new(operation: Operation, not_before: i64) -> Self {
        Self {
            id: operation.id,
            path: operation.path,
            verb: operation.verb,
            retry_count: operation.retry_count,
            last_error: operation.last_error,
            not_before,
        }
    }
}

/// Ensures the operation has an id and returns it.
pub(crate) fn assign_id(operation: &mut Operation) -> String {
    operation
        .id
        .get_or_insert_with(|| Uuid::new_v4().to_string())
        .clone()
}

/// Decodes a stored entry, logging and dropping it if malformed.
pub(crate) fn decode_entry(raw: &str) -> Option<Operation> {
    match Operation::from_json(raw.as_bytes()) {
        Ok(operation) => Some(operation),
        Err(e) => {
            warn!(error = %e, entry = %raw, "skipping malformed queue entry");
            None
        }
    }
}

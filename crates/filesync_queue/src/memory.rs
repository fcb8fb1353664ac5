//! In-memory delay queue.

use crate::clock::{Clock, SystemClock};
use crate::config::QueueConfig;
use crate::error::QueueResult;
use crate::queue::{assign_id, decode_entry, DelayedQueue, QueueListing};
use async_trait::async_trait;
use filesync_protocol::Operation;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct Entries {
    /// Keyed by `(not_before, sequence)` so ties keep insertion order.
    by_due: BTreeMap<(i64, u64), String>,
    next_seq: u64,
}

impl Entries {
    fn insert(&mut self, not_before: i64, raw: String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_due.insert((not_before, seq), raw);
    }
}

/// Delay queue held in process memory.
///
/// Entries are stored serialized, exactly as the Redis backend stores them.
#[derive(Debug)]
pub struct MemoryDelayQueue {
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    entries: Mutex<Entries>,
}

impl MemoryDelayQueue {
    /// Creates an empty queue on the wall clock.
    pub fn new(config: QueueConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty queue on the given clock.
    pub fn with_clock(config: QueueConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Stores a raw entry as-is.
    pub fn enqueue_raw(&self, not_before: i64, raw: impl Into<String>) {
        self.entries.lock().insert(not_before, raw.into());
    }
}

#[async_trait]
impl DelayedQueue for MemoryDelayQueue {
    async fn enqueue(&self, mut operation: Operation) -> QueueResult<String> {
        let id = assign_id(&mut operation);
        let not_before = self
            .config
            .not_before(self.clock.now_millis(), operation.retry_count);
        let raw = String::from_utf8_lossy(&operation.to_json()?).into_owned();

        self.entries.lock().insert(not_before, raw);
        debug!(id = %id, retry_count = operation.retry_count, not_before, "enqueued operation");
        Ok(id)
    }

    async fn poll_due(&self, limit: usize) -> QueueResult<Vec<Operation>> {
        let now = self.clock.now_millis();
        let raw: Vec<String> = {
            let mut entries = self.entries.lock();
            let due: Vec<(i64, u64)> = entries
                .by_due
                .range(..=(now, u64::MAX))
                .take(limit)
                .map(|(key, _)| *key)
                .collect();
            due.iter()
                .filter_map(|key| entries.by_due.remove(key))
                .collect()
        };

        Ok(raw.iter().filter_map(|entry| decode_entry(entry)).collect())
    }

    async fn size(&self) -> QueueResult<usize> {
        Ok(self.entries.lock().by_due.len())
    }

    async fn list(&self, limit: usize) -> QueueResult<Vec<QueueListing>> {
        let entries = self.entries.lock();
        Ok(entries
            .by_due
            .iter()
            .take(limit)
            .filter_map(|((not_before, _), raw)| {
                decode_entry(raw).map(|op| QueueListing::new(op, *not_before))
            })
            .collect())
    }

    async fn flush(&self) -> QueueResult<usize> {
        let mut entries = self.entries.lock();
        let count = entries.by_due.len();
        entries.by_due.clear();
        Ok(count)
    }
}

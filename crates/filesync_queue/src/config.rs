//! Queue and poller configuration.

use std::time::Duration;

/// Default Redis key of the sorted set.
pub const DEFAULT_QUEUE_KEY: &str = "file-sync";

/// Configuration shared by the queue backends.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Key of the sorted set (Redis backend only).
    pub key: String,
    /// Delay added per failed attempt.
    pub backoff_unit: Duration,
}

impl QueueConfig {
    /// Creates a configuration with the default backoff.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            backoff_unit: Duration::from_secs(2),
        }
    }

    /// Sets the backoff unit.
    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    /// Due time of an operation enqueued at `now_millis` with `retry_count`
    /// failed attempts behind it.
    pub fn not_before(&self, now_millis: i64, retry_count: u32) -> i64 {
        let unit = i64::try_from(self.backoff_unit.as_millis()).unwrap_or(i64::MAX);
        now_millis.saturating_add(unit.saturating_mul(i64::from(retry_count)))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_KEY)
    }
}

/// Configuration for the poll loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between polls.
    pub tick: Duration,
    /// Maximum operations fetched per tick.
    pub batch_size: usize,
}

impl PollerConfig {
    /// Sets the tick interval.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            batch_size: 10,
        }
    }
}

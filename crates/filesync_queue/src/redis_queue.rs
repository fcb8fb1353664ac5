//! Redis sorted-set delay queue.
//!
//! Score is the due time in Unix milliseconds, member is the serialized
//! operation. Fetch-and-remove runs as one Lua script, so concurrent
//! pollers never see the same member twice.

use crate::clock::{Clock, SystemClock};
use crate::config::QueueConfig;
use crate::error::QueueResult;
use crate::queue::{assign_id, decode_entry, DelayedQueue, QueueListing};
use async_trait::async_trait;
use filesync_protocol::Operation;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const POLL_DUE_SCRIPT: &str = r"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, ARGV[2])
if #due > 0 then
    redis.call('ZREM', KEYS[1], unpack(due))
end
return due
";

const FLUSH_SCRIPT: &str = r"
local count = redis.call('ZCARD', KEYS[1])
redis.call('DEL', KEYS[1])
return count
";

/// Delay queue stored in a Redis sorted set.
#[derive(Clone)]
pub struct RedisDelayQueue {
    connection: MultiplexedConnection,
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    poll_script: Arc<Script>,
    flush_script: Arc<Script>,
}

impl RedisDelayQueue {
    /// Parses `url` without connecting.
    ///
    /// `redis://` is plain TCP, `rediss://` is TLS verified against the
    /// system roots, and a `#insecure` fragment skips certificate checks.
    pub fn client(url: &str) -> QueueResult<redis::Client> {
        Ok(redis::Client::open(url)?)
    }

    /// Connects to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str, config: QueueConfig) -> QueueResult<Self> {
        let client = Self::client(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!(url = %url, key = %config.key, "connected to redis queue");
        Ok(Self::with_connection(
            connection,
            config,
            Arc::new(SystemClock),
        ))
    }

    /// Wraps an existing connection.
    pub fn with_connection(
        connection: MultiplexedConnection,
        config: QueueConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connection,
            config,
            clock,
            poll_script: Arc::new(Script::new(POLL_DUE_SCRIPT)),
            flush_script: Arc::new(Script::new(FLUSH_SCRIPT)),
        }
    }

    /// Returns the sorted-set key.
    pub fn key(&self) -> &str {
        &self.config.key
    }
}

impl fmt::Debug for RedisDelayQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisDelayQueue")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DelayedQueue for RedisDelayQueue {
    async fn enqueue(&self, mut operation: Operation) -> QueueResult<String> {
        let id = assign_id(&mut operation);
        let not_before = self
            .config
            .not_before(self.clock.now_millis(), operation.retry_count);
        let member = operation.to_json()?;

        let mut connection = self.connection.clone();
        let _: () = connection
            .zadd(&self.config.key, member, not_before)
            .await?;

        debug!(id = %id, retry_count = operation.retry_count, not_before, "enqueued operation");
        Ok(id)
    }

    async fn poll_due(&self, limit: usize) -> QueueResult<Vec<Operation>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut connection = self.connection.clone();
        let raw: Vec<String> = self
            .poll_script
            .key(&self.config.key)
            .arg(self.clock.now_millis())
            .arg(limit)
            .invoke_async(&mut connection)
            .await?;

        Ok(raw.iter().filter_map(|entry| decode_entry(entry)).collect())
    }

    async fn size(&self) -> QueueResult<usize> {
        let mut connection = self.connection.clone();
        let size: usize = connection.zcard(&self.config.key).await?;
        Ok(size)
    }

    async fn list(&self, limit: usize) -> QueueResult<Vec<QueueListing>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        let mut connection = self.connection.clone();
        let entries: Vec<(String, f64)> = connection
            .zrange_withscores(&self.config.key, 0, stop)
            .await?;

        Ok(entries
            .iter()
            .filter_map(|(raw, score)| {
                decode_entry(raw).map(|op| QueueListing::new(op, *score as i64))
            })
            .collect())
    }

    async fn flush(&self) -> QueueResult<usize> {
        let mut connection = self.connection.clone();
        let count: usize = self
            .flush_script
            .key(&self.config.key)
            .invoke_async(&mut connection)
            .await?;
        info!(key = %self.config.key, count, "flushed queue");
        Ok(count)
    }
}

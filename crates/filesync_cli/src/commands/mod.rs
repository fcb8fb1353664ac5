//! CLI command implementations.

pub mod apply;
pub mod queue;
pub mod send;
pub mod serve;

use crate::config::AppConfig;
use crate::error::CliResult;
use filesync_engine::{DeliveryService, HttpsTransport, TlsMaterial};
use filesync_queue::{DelayedQueue, RedisDelayQueue};
use std::sync::Arc;
use tracing::info;

/// Connects to the configured Redis delay queue.
pub async fn open_queue(config: &AppConfig) -> CliResult<Arc<RedisDelayQueue>> {
    let url = config.redis.connection_url();
    let queue = RedisDelayQueue::connect(&url, config.queue_config()).await?;
    info!(
        tls = url.starts_with("rediss://"),
        key = %queue.key(),
        "connected to delay queue"
    );
    Ok(Arc::new(queue))
}

/// Builds the sender: HTTPS transport plus the queue when Redis is enabled.
pub async fn build_delivery(
    config: &AppConfig,
    material: &TlsMaterial,
) -> CliResult<(DeliveryService, Option<Arc<dyn DelayedQueue>>)> {
    let transport = Arc::new(HttpsTransport::new(material, config.transport_config())?);
    let delivery = DeliveryService::new(transport, config.retry_config());

    if !config.redis.enabled {
        return Ok((delivery, None));
    }
    let queue: Arc<dyn DelayedQueue> = open_queue(config).await?;
    Ok((delivery.with_queue(queue.clone()), Some(queue)))
}

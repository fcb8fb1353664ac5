//! Delivery and retry orchestration.
//!
//! Every failed attempt bumps `retry_count` and records the error on the
//! operation. With a queue configured the operation goes back into the queue,
//! which delays it in proportion to `retry_count`; without one the service
//! sleeps `retry_timeout` and tries again in-process. Either way an operation
//! is attempted at most `max_attempts` times.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use async_trait::async_trait;
use filesync_protocol::{Operation, SyncResponse};
use filesync_queue::{DelayedQueue, OperationHandler};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Operations acknowledged by their peer.
    pub delivered: u64,
    /// Failed attempts, including the last one of an abandoned operation.
    pub failed_attempts: u64,
    /// Operations handed back to the queue.
    pub requeued: u64,
    /// Operations dropped after the retry budget ran out.
    pub abandoned: u64,
    /// Most recent failure.
    pub last_error: Option<String>,
}

/// What happened to an operation after one pass through the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The peer applied it.
    Delivered(SyncResponse),
    /// It failed and was rescheduled.
    Requeued {
        /// Queue id.
        id: String,
        /// Failed attempts so far.
        attempts: u32,
    },
    /// It failed for the last time and was dropped.
    Abandoned {
        /// Total failed attempts.
        attempts: u32,
    },
}

/// How a submitted operation was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Stored in the retry queue under this id.
    Queued(String),
    /// Handed to a background delivery task.
    Dispatched,
}

/// Delivers operations and retries failures.
pub struct DeliveryService {
    transport: Arc<dyn SyncTransport>,
    queue: Option<Arc<dyn DelayedQueue>>,
    retry: RetryConfig,
    stats: RwLock<DeliveryStats>,
}

impl DeliveryService {
    /// Creates a service that retries in-process.
    pub fn new(transport: Arc<dyn SyncTransport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            queue: None,
            retry,
            stats: RwLock::new(DeliveryStats::default()),
        }
    }

    /// Routes submissions and retries through `queue`.
    pub fn with_queue(mut self, queue: Arc<dyn DelayedQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Returns the configured queue, if any.
    pub fn queue(&self) -> Option<&Arc<dyn DelayedQueue>> {
        self.queue.as_ref()
    }

    /// Returns the retry configuration.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Gets the current stats.
    pub fn stats(&self) -> DeliveryStats {
        self.stats.read().clone()
    }

    /// Makes one attempt.
    pub async fn deliver(&self, operation: &Operation) -> SyncResult<SyncResponse> {
        let response = self.transport.send(operation).await?;
        self.stats.write().delivered += 1;
        info!(
            id = ?operation.id,
            verb = %operation.verb,
            path = %operation.path,
            destination = %operation.destination,
            retry_count = operation.retry_count,
            "operation delivered"
        );
        Ok(response)
    }

    /// Records a failed attempt, then requeues or abandons the operation.
    pub async fn handle_failure(&self, mut operation: Operation, error: &SyncError) -> DeliveryOutcome {
        self.record_failure(&mut operation, error);
        if self.retry.is_exhausted(operation.retry_count) {
            return self.abandon(&operation);
        }

        let Some(queue) = &self.queue else {
            return self.abandon(&operation);
        };

        match queue.enqueue(operation.clone()).await {
            Ok(id) => {
                self.stats.write().requeued += 1;
                warn!(
                    id = %id,
                    operation = %operation,
                    retry_count = operation.retry_count,
                    error = %error,
                    "delivery failed, requeued"
                );
                DeliveryOutcome::Requeued {
                    id,
                    attempts: operation.retry_count,
                }
            }
            Err(e) => {
                error!(operation = %operation, error = %e, "could not requeue operation");
                self.abandon(&operation)
            }
        }
    }

    /// Makes one attempt and handles its failure.
    pub async fn process(&self, operation: Operation) -> DeliveryOutcome {
        match self.deliver(&operation).await {
            Ok(response) => DeliveryOutcome::Delivered(response),
            Err(e) => self.handle_failure(operation, &e).await,
        }
    }

    /// Attempts delivery in-process, sleeping `retry_timeout` between
    /// attempts, until it succeeds or the budget runs out.
    pub async fn deliver_with_retry(&self, mut operation: Operation) -> DeliveryOutcome {
        loop {
            let error = match self.deliver(&operation).await {
                Ok(response) => return DeliveryOutcome::Delivered(response),
                Err(e) => e,
            };

            self.record_failure(&mut operation, &error);
            if self.retry.is_exhausted(operation.retry_count) {
                return self.abandon(&operation);
            }

            warn!(
                operation = %operation,
                retry_count = operation.retry_count,
                error = %error,
                "delivery failed, retrying in {:?}",
                self.retry.retry_timeout
            );
            tokio::time::sleep(self.retry.retry_timeout).await;
        }
    }

    /// Accepts an operation for delivery.
    ///
    /// With a queue the operation is stored and its id returned; otherwise a
    /// background task runs [`deliver_with_retry`](Self::deliver_with_retry).
    pub async fn submit(self: &Arc<Self>, operation: Operation) -> SyncResult<Submission> {
        if let Some(queue) = &self.queue {
            let id = queue.enqueue(operation).await?;
            return Ok(Submission::Queued(id));
        }

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.deliver_with_retry(operation).await;
        });
        Ok(Submission::Dispatched)
    }

    fn record_failure(&self, operation: &mut Operation, error: &SyncError) {
        operation.record_failure(error.to_string());
        let mut stats = self.stats.write();
        stats.failed_attempts += 1;
        stats.last_error = Some(error.to_string());
    }

    fn abandon(&self, operation: &Operation) -> DeliveryOutcome {
        self.stats.write().abandoned += 1;
        warn!(
            id = ?operation.id,
            operation = %operation,
            retry_count = operation.retry_count,
            last_error = ?operation.last_error,
            "retry limit reached, dropping operation"
        );
        DeliveryOutcome::Abandoned {
            attempts: operation.retry_count,
        }
    }
}

#[async_trait]
impl OperationHandler for DeliveryService {
    async fn handle(&self, operation: Operation) {
        self.process(operation).await;
    }
}

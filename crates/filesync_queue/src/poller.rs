//! Poll loop that drains due operations.

use crate::config::PollerConfig;
use crate::queue::DelayedQueue;
use async_trait::async_trait;
use filesync_protocol::Operation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Receives operations that came due.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Handles one operation. Failures are the handler's to deal with.
    async fn handle(&self, operation: Operation);
}

/// Drains a [`DelayedQueue`] on a fixed tick.
///
/// Each tick fetches up to `batch_size` due operations and passes them, in
/// fetch order, to the handler while holding the dispatch lock. The stop flag
/// is checked between ticks, so a batch in flight always completes.
pub struct QueuePoller {
    queue: Arc<dyn DelayedQueue>,
    handler: Arc<dyn OperationHandler>,
    config: PollerConfig,
    dispatch: Mutex<()>,
    stopped: AtomicBool,
}

impl QueuePoller {
    /// Creates a poller.
    pub fn new(
        queue: Arc<dyn DelayedQueue>,
        handler: Arc<dyn OperationHandler>,
        config: PollerConfig,
    ) -> Self {
        Self {
            queue,
            handler,
            config,
            dispatch: Mutex::new(()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Runs one poll and dispatch, returning the number of operations handled.
    ///
    /// A backing-store failure is logged and counts as an empty tick.
    pub async fn tick(&self) -> usize {
        let _guard = self.dispatch.lock().await;

        let due = match self.queue.poll_due(self.config.batch_size).await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "queue poll failed, skipping tick");
                return 0;
            }
        };

        let count = due.len();
        for operation in due {
            debug!(id = ?operation.id, operation = %operation, "dispatching due operation");
            self.handler.handle(operation).await;
        }
        count
    }

    /// Ticks until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        let mut ticker = interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(tick = ?self.config.tick, batch_size = self.config.batch_size, "queue poller started");

        loop {
            ticker.tick().await;
            if self.is_stopped() {
                break;
            }
            self.tick().await;
        }

        info!("queue poller stopped");
    }

    /// Runs the loop on a new task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Asks the loop to exit before its next tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

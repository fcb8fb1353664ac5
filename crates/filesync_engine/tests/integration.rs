//! Delivery through the queue, poller and transports together.

use filesync_core::{ExecutorConfig, FileExecutor, SourceResolver};
use filesync_engine::{
    DeliveryService, LoopbackTransport, MockOutcome, MockTransport, RetryConfig, Submission,
};
use filesync_protocol::{Instruction, Operation};
use filesync_queue::{
    DelayedQueue, ManualClock, MemoryDelayQueue, PollerConfig, QueueConfig, QueuePoller,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    clock: Arc<ManualClock>,
    queue: Arc<MemoryDelayQueue>,
    service: Arc<DeliveryService>,
    poller: QueuePoller,
}

impl Harness {
    fn new(transport: Arc<dyn filesync_engine::SyncTransport>, max_attempts: u32) -> Self {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let queue = Arc::new(MemoryDelayQueue::with_clock(
            QueueConfig::default().with_backoff_unit(Duration::from_secs(2)),
            clock.clone(),
        ));
        let service = Arc::new(
            DeliveryService::new(transport, RetryConfig::new(max_attempts))
                .with_queue(queue.clone()),
        );
        let poller = QueuePoller::new(queue.clone(), service.clone(), PollerConfig::default());
        Self {
            clock,
            queue,
            service,
            poller,
        }
    }

    /// Ticks, advancing the clock past the longest backoff in between,
    /// until the queue is empty.
    async fn drain(&self) -> usize {
        let mut ticks = 0;
        loop {
            self.poller.tick().await;
            ticks += 1;
            if self.queue.size().await.unwrap() == 0 || ticks > 100 {
                return ticks;
            }
            self.clock.advance(Duration::from_secs(60));
        }
    }
}

#[tokio::test]
async fn permanently_failing_transport_is_abandoned_after_cap_attempts() {
    let transport = Arc::new(MockTransport::with_fallback(MockOutcome::Unreachable));
    let harness = Harness::new(transport.clone(), 5);

    harness
        .service
        .submit(Operation::delete("a.txt"))
        .await
        .unwrap();
    harness.drain().await;

    assert_eq!(transport.send_count(), 5);
    let retry_counts: Vec<u32> = transport.sent().iter().map(|op| op.retry_count).collect();
    assert_eq!(retry_counts, [0, 1, 2, 3, 4]);

    let stats = harness.service.stats();
    assert_eq!(stats.failed_attempts, 5);
    assert_eq!(stats.requeued, 4);
    assert_eq!(stats.abandoned, 1);
    assert_eq!(stats.delivered, 0);
}

#[tokio::test]
async fn requeued_operation_waits_for_its_backoff() {
    let transport = Arc::new(MockTransport::new());
    transport.push_outcome(MockOutcome::Status(503));
    let harness = Harness::new(transport.clone(), 5);

    harness
        .service
        .submit(Operation::delete("a.txt"))
        .await
        .unwrap();

    assert_eq!(harness.poller.tick().await, 1);
    assert_eq!(harness.poller.tick().await, 0);
    assert_eq!(transport.send_count(), 1);

    harness.clock.advance(Duration::from_secs(2));
    assert_eq!(harness.poller.tick().await, 1);
    assert_eq!(transport.send_count(), 2);
    assert_eq!(harness.service.stats().delivered, 1);
}

#[tokio::test]
async fn put_flows_from_source_to_destination() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    std::fs::create_dir_all(source.path().join("tests")).unwrap();
    std::fs::write(source.path().join("tests/test.txt"), b"dsdd").unwrap();

    let executor = Arc::new(FileExecutor::new(ExecutorConfig::new(destination.path())));
    let harness = Harness::new(Arc::new(LoopbackTransport::new(executor)), 5);

    let resolver = SourceResolver::new(source.path());
    let operation = resolver
        .resolve(Instruction::parse("put:tests/test.txt").unwrap())
        .unwrap();
    assert_eq!(operation.content_base64.as_deref(), Some("ZHNkZA=="));

    let submission = harness.service.submit(operation).await.unwrap();
    assert!(matches!(submission, Submission::Queued(_)));
    harness.drain().await;

    assert_eq!(
        std::fs::read(destination.path().join("tests/test.txt")).unwrap(),
        b"dsdd"
    );
    assert_eq!(harness.service.stats().delivered, 1);
}

#[tokio::test]
async fn delete_of_missing_file_succeeds_once_past_receiver_cap() {
    let destination = TempDir::new().unwrap();
    let executor = Arc::new(FileExecutor::new(
        ExecutorConfig::new(destination.path()).with_retry_cap(2),
    ));
    let harness = Harness::new(Arc::new(LoopbackTransport::new(executor)), 5);

    harness
        .service
        .submit(Operation::delete("never-there.txt"))
        .await
        .unwrap();
    harness.drain().await;

    let stats = harness.service.stats();
    assert_eq!(stats.failed_attempts, 3);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.abandoned, 0);
}

#[tokio::test]
async fn precondition_failure_is_still_bounded() {
    let destination = TempDir::new().unwrap();
    std::fs::write(destination.path().join("a.txt"), b"old").unwrap();
    let executor = Arc::new(FileExecutor::new(ExecutorConfig::new(destination.path())));
    let harness = Harness::new(Arc::new(LoopbackTransport::new(executor)), 3);

    harness
        .service
        .submit(Operation::put("a.txt", b"new"))
        .await
        .unwrap();
    harness.drain().await;

    let stats = harness.service.stats();
    assert_eq!(stats.failed_attempts, 3);
    assert_eq!(stats.abandoned, 1);
    assert_eq!(
        std::fs::read(destination.path().join("a.txt")).unwrap(),
        b"old"
    );
}

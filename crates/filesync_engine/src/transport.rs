//! Transport layer abstraction for delivery.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use filesync_core::FileExecutor;
use filesync_protocol::{Operation, SyncResponse};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Carries one operation to its peer.
///
/// Implementations return `Ok` only when the peer acknowledged the operation
/// with application status 200.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Sends `operation` and returns the peer's acknowledgement.
    async fn send(&self, operation: &Operation) -> SyncResult<SyncResponse>;
}

/// Turns a decoded acknowledgement into success or [`SyncError::Rejected`].
pub(crate) fn accept(response: SyncResponse) -> SyncResult<SyncResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(SyncError::Rejected {
            status_code: response.status_code,
            status_text: response.status_text,
        })
    }
}

/// Applies operations to a local executor, skipping the network.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    executor: Arc<FileExecutor>,
}

impl LoopbackTransport {
    /// Creates a transport that applies to `executor`.
    pub fn new(executor: Arc<FileExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl SyncTransport for LoopbackTransport {
    async fn send(&self, operation: &Operation) -> SyncResult<SyncResponse> {
        let executor = Arc::clone(&self.executor);
        let operation = operation.clone();
        let response = tokio::task::spawn_blocking(move || executor.respond(&operation))
            .await
            .map_err(|e| SyncError::transport(format!("executor task failed: {e}")))?;
        accept(response)
    }
}

/// Scripted result of one [`MockTransport`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Acknowledge with status 200.
    Accept,
    /// Acknowledge with an application error.
    Reject {
        /// Application status.
        status_code: u16,
        /// Error text.
        status_text: String,
    },
    /// Non-200 HTTP status.
    Status(u16),
    /// Connection failure.
    Unreachable,
    /// Request timed out.
    Timeout,
}

/// A mock transport for testing.
///
/// Scripted outcomes are consumed in order; once they run out every call
/// gets the fallback, which starts as [`MockOutcome::Accept`].
#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    sent: Mutex<Vec<Operation>>,
}

impl MockTransport {
    /// Creates a mock that accepts everything.
    pub fn new() -> Self {
        Self::with_fallback(MockOutcome::Accept)
    }

    /// Creates a mock whose unscripted calls get `fallback`.
    pub fn with_fallback(fallback: MockOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queues an outcome for the next unscripted call.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Returns every operation sent so far, as it was sent.
    pub fn sent(&self) -> Vec<Operation> {
        self.sent.lock().clone()
    }

    /// Returns the number of calls made.
    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn send(&self, operation: &Operation) -> SyncResult<SyncResponse> {
        self.sent.lock().push(operation.clone());
        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match outcome {
            MockOutcome::Accept => Ok(SyncResponse::ok(operation)),
            MockOutcome::Reject {
                status_code,
                status_text,
            } => accept(SyncResponse::failed(operation, status_code, status_text)),
            MockOutcome::Status(code) => Err(SyncError::Status(code)),
            MockOutcome::Unreachable => Err(SyncError::transport("connection refused")),
            MockOutcome::Timeout => Err(SyncError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filesync_core::ExecutorConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn mock_follows_script_then_fallback() {
        let transport = MockTransport::with_fallback(MockOutcome::Timeout);
        transport.push_outcome(MockOutcome::Accept);
        transport.push_outcome(MockOutcome::Status(502));

        let op = Operation::delete("a.txt");
        assert!(transport.send(&op).await.is_ok());
        assert!(matches!(transport.send(&op).await, Err(SyncError::Status(502))));
        assert!(matches!(transport.send(&op).await, Err(SyncError::Timeout)));
        assert_eq!(transport.send_count(), 3);
    }

    #[tokio::test]
    async fn mock_reject_is_an_error() {
        let transport = MockTransport::new();
        transport.push_outcome(MockOutcome::Reject {
            status_code: 409,
            status_text: "file a.txt must not exist".into(),
        });

        let err = transport
            .send(&Operation::put("a.txt", b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rejected { status_code: 409, .. }));
    }

    #[tokio::test]
    async fn loopback_applies_locally() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FileExecutor::new(ExecutorConfig::new(dir.path())));
        let transport = LoopbackTransport::new(executor);

        let response = transport
            .send(&Operation::put("tests/test.txt", b"dsdd"))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(
            std::fs::read(dir.path().join("tests/test.txt")).unwrap(),
            b"dsdd"
        );

        let err = transport
            .send(&Operation::put("tests/test.txt", b"again"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rejected { status_code: 409, .. }));
    }
}

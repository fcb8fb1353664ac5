//! Configuration for delivery.

use std::time::Duration;

/// Default peer address when an operation names none.
pub const DEFAULT_DESTINATION: &str = "localhost:9335";

/// Configuration for the HTTPS transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Peer used when an operation has an empty destination.
    pub default_destination: String,
    /// Upper bound on one request, connect to last byte.
    pub timeout: Duration,
}

impl TransportConfig {
    /// Creates a configuration for `default_destination`.
    pub fn new(default_destination: impl Into<String>) -> Self {
        Self {
            default_destination: default_destination.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the sync endpoint of `destination`, or of the default peer.
    pub fn sync_url(&self, destination: &str) -> String {
        let host = if destination.is_empty() {
            &self.default_destination
        } else {
            destination
        };
        format!("https://{host}/api/sync")
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DESTINATION)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts before an operation is abandoned.
    pub max_attempts: u32,
    /// Pause between in-process attempts when no queue is configured.
    pub retry_timeout: Duration,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            retry_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the pause between in-process attempts.
    pub fn with_retry_timeout(mut self, retry_timeout: Duration) -> Self {
        self.retry_timeout = retry_timeout;
        self
    }

    /// Returns true once `attempts` failed attempts exhaust the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

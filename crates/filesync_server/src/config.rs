//! Server configuration.

use std::net::SocketAddr;

/// Configuration for the two listeners.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Mutual-TLS listener serving `/api/sync`.
    pub sync_addr: SocketAddr,
    /// Plain listener serving `/api/queue`.
    pub queue_addr: SocketAddr,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(sync_addr: SocketAddr, queue_addr: SocketAddr) -> Self {
        Self {
            sync_addr,
            queue_addr,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }

    /// Sets the request body limit.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(
            SocketAddr::from(([0, 0, 0, 0], 9335)),
            SocketAddr::from(([0, 0, 0, 0], 9336)),
        )
    }
}

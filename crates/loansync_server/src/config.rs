//! Server configuration.

use std::net::SocketAddr;

/// Default upper bound on a webhook body: 10 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Configuration for the webhook server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the hosting transport binds to.
    pub bind_addr: SocketAddr,
    /// Path that receives event batches.
    pub webhook_path: String,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            webhook_path: "/webhook".to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Sets the webhook path. A missing leading slash is added.
    pub fn with_webhook_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.webhook_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Sets the maximum body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8000)))
    }
}

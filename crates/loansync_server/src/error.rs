//! Error types for the webhook server.

use loansync_engine::SyncError;
use loansync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a webhook request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The body is not an event batch.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The body exceeds the configured limit.
    #[error("payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge {
        /// Size of the rejected body.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The replica is still importing and cannot take live events yet.
    #[error("not accepting events until the initial import completes")]
    NotAccepting,

    /// No route for this method and path.
    #[error("no route for {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The batch could not be processed and should be redelivered.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::NotFound { .. } => 404,
            ServerError::PayloadTooLarge { .. } => 413,
            ServerError::NotAccepting => 503,
            ServerError::Sync(_) => 500,
        }
    }

    /// Returns true if redelivering the same request may succeed.
    ///
    /// A failed batch is still answered with a server error when it is not
    /// retryable, but the cause (for example revoked credentials) needs
    /// attention before redelivery can help.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServerError::NotAccepting => true,
            ServerError::Sync(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    ///
    /// The sender redelivers batches answered with a server error.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::NotAccepting.is_server_error());
        assert!(ServerError::Sync(SyncError::Timeout).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
    }

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::from(ProtocolError::MissingMarker).status_code(), 400);
        assert_eq!(
            ServerError::PayloadTooLarge { size: 2, limit: 1 }.status_code(),
            413
        );
        assert_eq!(ServerError::NotAccepting.status_code(), 503);
        assert_eq!(
            ServerError::Sync(SyncError::BatchFailed {
                failed: 1,
                total: 2,
                first: "boom".into(),
                retryable: true,
            })
            .status_code(),
            500
        );
    }

    #[test]
    fn retry_classification() {
        assert!(ServerError::NotAccepting.is_retryable());
        assert!(ServerError::Sync(SyncError::Timeout).is_retryable());
        assert!(!ServerError::Sync(SyncError::transport_fatal("unauthenticated")).is_retryable());
        assert!(!ServerError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let msg = ServerError::PayloadTooLarge {
            size: 2048,
            limit: 1024,
        }
        .to_string();
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }
}

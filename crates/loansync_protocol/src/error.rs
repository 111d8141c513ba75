//! Error types for protocol decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding webhook payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not marked as a `SubscriptionEventsBatch`.
    #[error("body is not a SubscriptionEventsBatch")]
    MissingMarker,

    /// The body is not valid JSON or does not match the batch shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An individual event has an unrecognized kind or shape.
    #[error("malformed event: {message}")]
    MalformedEvent {
        /// Description of the problem.
        message: String,
    },

    /// A field selector could not be parsed.
    #[error("invalid selector {selector:?} at position {position}: {message}")]
    InvalidSelector {
        /// The selector text.
        selector: String,
        /// Byte offset of the problem.
        position: usize,
        /// Description of the problem.
        message: String,
    },
}

impl ProtocolError {
    /// Creates a malformed-event error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            message: message.into(),
        }
    }
}

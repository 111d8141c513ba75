//! Error types for the sync engine.

use loansync_protocol::{FieldChangeKind, ProtocolError};
use loansync_storage::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Patch failures are not represented here: the reconciler recovers from
/// them locally by refetching.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error talking to the remote source.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Payload decoding error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The remote source answered with something unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// At least one event of a batch could not be reconciled.
    #[error("{failed} of {total} events failed; first error: {first}")]
    BatchFailed {
        /// Number of failed events.
        failed: usize,
        /// Number of events in the batch.
        total: usize,
        /// Message of the first failure.
        first: String,
        /// Whether every failure may succeed on redelivery.
        retryable: bool,
    },
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if redelivering the same work may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            SyncError::Store(StoreError::Io(_)) => true,
            SyncError::BatchFailed { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

/// Result type for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;

/// Errors raised while applying one field change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The selector does not resolve against the target.
    #[error("invalid selector in {kind}: {path}")]
    Selector {
        /// Change being applied.
        kind: FieldChangeKind,
        /// Shortest unresolvable prefix of the selector.
        path: String,
    },

    /// The current value at the selector violates the change's precondition.
    #[error("unexpected existing value of type {found} for {kind} at {path}")]
    Precondition {
        /// Change being applied.
        kind: FieldChangeKind,
        /// Selector of the field.
        path: String,
        /// JSON type found at the selector.
        found: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("unauthenticated").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(!SyncError::InvalidResponse("no id".into()).is_retryable());
        assert!(!SyncError::Store(StoreError::InvalidId("..".into())).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::BatchFailed {
            failed: 2,
            total: 5,
            first: "transport error: down".into(),
            retryable: true,
        };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "2 of 5 events failed; first error: transport error: down");

        let err = PatchError::Precondition {
            kind: FieldChangeKind::Create,
            path: "amount".into(),
            found: "number",
        };
        assert_eq!(
            err.to_string(),
            "unexpected existing value of type number for FieldCreate at amount"
        );
    }
}

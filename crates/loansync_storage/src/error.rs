//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// A record that does not exist is not an error; reads report it as
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The object id cannot be used as a record name.
    #[error("invalid object id: {0:?}")]
    InvalidId(String),

    /// Another process holds the data directory lock.
    #[error("data directory locked: {path}")]
    Locked {
        /// The locked directory.
        path: String,
    },
}

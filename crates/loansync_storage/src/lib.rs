//! # loansync storage
//!
//! Durable key-value persistence for the replica.
//!
//! Each object type lives in its own [`ObjectStore`]: one self-contained
//! JSON document per object id, fronted by a bounded least-recently-used
//! read cache. The cache is write-through and never the sole holder of a
//! value; evicting an entry has no effect on the durable copy.
//!
//! ## Design Principles
//!
//! - Every `write`/`delete` is durable before the call returns
//! - A missing record is `Ok(None)`, never an error
//! - `count` reflects durable storage, not cache occupancy
//! - Stores are `Send + Sync`; concurrent calls for different ids never
//!   interfere, while same-id serialization is the caller's job
//!
//! ## Available Stores
//!
//! - [`JsonFileStore`] - One `<id>.json` file per object in a directory
//! - [`InMemoryStore`] - For tests and offline tooling
//! - [`SingletonStore`] - Fixed-id projection over any keyed store
//!
//! ## Example
//!
//! ```rust
//! use loansync_storage::{InMemoryStore, ObjectStore};
//!
//! let store: InMemoryStore = InMemoryStore::new();
//! store.write("loan-1", &serde_json::json!({"id": "loan-1"})).unwrap();
//! assert_eq!(store.count().unwrap(), 1);
//! assert!(store.read("loan-2").unwrap().is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod dir;
mod error;
mod file;
mod memory;
mod store;

pub use cache::LruCache;
pub use dir::{DataDir, STATUS_ID};
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use memory::InMemoryStore;
pub use store::{validate_id, ObjectStore, SingletonStore};

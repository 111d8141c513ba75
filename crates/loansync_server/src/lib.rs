//! # loansync server
//!
//! Webhook front end for the loansync replica engine.
//!
//! This crate provides:
//! - Webhook request handling with HTTP status mapping
//! - A live-mode gate that defers batches until the initial import is done
//! - A health check route
//!
//! # Architecture
//!
//! The server owns no HTTP listener. The hosting transport hands each
//! request's method, path and body to [`WebhookServer::handle_request`]
//! and writes back the returned status and body. Decoded batches go to a
//! [`loansync_engine::BatchHandler`], normally the `SyncCoordinator`.
//!
//! # Status Codes
//!
//! | Status | Meaning |
//! |--------|---------|
//! | 200 | Batch processed, or health check |
//! | 400 | Not JSON, or not a `SubscriptionEventsBatch` |
//! | 404 | Unknown route |
//! | 413 | Body larger than `max_body_size` |
//! | 503 | Initial import still running; sender redelivers |
//! | 500 | An event failed to reconcile; sender redelivers |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;

pub use config::{ServerConfig, DEFAULT_MAX_BODY_SIZE};
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::{WebhookResponse, WebhookServer};

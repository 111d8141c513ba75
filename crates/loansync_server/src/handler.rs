//! Request handlers for the webhook endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use loansync_engine::{BatchHandler, BatchSummary};
use loansync_protocol::SubscriptionEventsBatch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Context shared by all request handlers.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Consumer of decoded batches.
    batches: Arc<dyn BatchHandler>,
    /// Live-mode gate; closed until the initial import completes.
    accepting: AtomicBool,
}

impl HandlerContext {
    /// Creates a context with the live-mode gate closed.
    pub fn new(config: ServerConfig, batches: Arc<dyn BatchHandler>) -> Self {
        Self {
            config,
            batches,
            accepting: AtomicBool::new(false),
        }
    }

    /// Opens or closes the live-mode gate.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Returns whether batches are currently dispatched.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

/// Handler for webhook requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles the health check.
    pub fn handle_health(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "ok",
            "accepting": self.context.is_accepting(),
        })
    }

    /// Handles one webhook delivery.
    ///
    /// The size limit is checked before the gate so oversized bodies are
    /// rejected permanently rather than redelivered.
    pub fn handle_webhook(&self, body: &[u8]) -> ServerResult<BatchSummary> {
        let limit = self.context.config.max_body_size;
        if body.len() > limit {
            warn!(size = body.len(), limit, "Rejecting oversized webhook body");
            return Err(ServerError::PayloadTooLarge {
                size: body.len(),
                limit,
            });
        }

        if !self.context.is_accepting() {
            info!("Deferring webhook batch until initial import completes");
            return Err(ServerError::NotAccepting);
        }

        let batch = SubscriptionEventsBatch::from_slice(body).map_err(|e| {
            warn!(error = %e, "Rejecting webhook body");
            ServerError::from(e)
        })?;

        match self.context.batches.handle_batch(&batch) {
            Ok(summary) => {
                info!(
                    events = summary.events,
                    written = summary.written,
                    "Processed webhook batch"
                );
                Ok(summary)
            }
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Webhook batch failed; expecting redelivery");
                Err(ServerError::Sync(e))
            }
            Err(e) => {
                error!(error = %e, "Webhook batch failed with a non-retryable error");
                Err(ServerError::Sync(e))
            }
        }
    }
}

//! Main webhook server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use loansync_engine::{BatchHandler, StartupReport, SyncResult};
use std::sync::Arc;
use tracing::{error, info};

/// A plain HTTP response produced by [`WebhookServer::handle_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON response body.
    pub body: String,
}

impl WebhookResponse {
    fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    fn from_error(err: &ServerError) -> Self {
        Self::json(
            err.status_code(),
            &serde_json::json!({
                "error": err.to_string(),
                "retryable": err.is_retryable(),
            }),
        )
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The webhook server.
///
/// Transport-agnostic: the hosting HTTP layer passes the method, path and
/// raw body of each request and writes back the returned status and body.
/// Requests may be handled from many threads at once.
///
/// # Example
///
/// ```
/// use loansync_engine::{EventDispatcher, MockRemote, Reconciler};
/// use loansync_server::{ServerConfig, WebhookServer};
/// use loansync_storage::InMemoryStore;
/// use std::sync::Arc;
///
/// let store: InMemoryStore = InMemoryStore::new();
/// let dispatcher = EventDispatcher::new(Reconciler::new(store, MockRemote::new()), "Loan");
/// let server = WebhookServer::new(ServerConfig::default(), Arc::new(dispatcher));
///
/// assert_eq!(server.handle_request("GET", "/", b"").status, 200);
/// // Batches are deferred until the replica is live
/// assert_eq!(server.handle_request("POST", "/webhook", b"{}").status, 503);
/// ```
pub struct WebhookServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl WebhookServer {
    /// Creates a new server with the live-mode gate closed.
    pub fn new(config: ServerConfig, batches: Arc<dyn BatchHandler>) -> Self {
        let context = Arc::new(HandlerContext::new(config, batches));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Returns whether batches are currently dispatched.
    pub fn is_accepting(&self) -> bool {
        self.context.is_accepting()
    }

    /// Opens or closes the live-mode gate.
    pub fn set_accepting(&self, accepting: bool) {
        self.context.set_accepting(accepting);
    }

    /// Runs the replica's startup (typically
    /// `SyncCoordinator::initialize`) and opens the gate once it succeeds.
    ///
    /// Requests arriving meanwhile are answered 503 so the sender
    /// redelivers them after the import.
    ///
    /// # Errors
    ///
    /// Returns the startup error; the gate then stays closed.
    pub fn go_live<F>(&self, startup: F) -> ServerResult<StartupReport>
    where
        F: FnOnce() -> SyncResult<StartupReport>,
    {
        match startup() {
            Ok(report) => {
                self.set_accepting(true);
                info!(webhook_path = %self.config().webhook_path, "Accepting live events");
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Startup failed; live events stay deferred");
                Err(ServerError::Sync(e))
            }
        }
    }

    /// Routes one request.
    pub fn handle_request(&self, method: &str, path: &str, body: &[u8]) -> WebhookResponse {
        let result = match (method, path) {
            ("GET", "/") => return WebhookResponse::json(200, &self.handler.handle_health()),
            ("POST", p) if p == self.config().webhook_path => self.handler.handle_webhook(body),
            _ => Err(ServerError::NotFound {
                method: method.to_string(),
                path: path.to_string(),
            }),
        };

        match result {
            Ok(summary) => WebhookResponse::json(
                200,
                &serde_json::json!({
                    "events": summary.events,
                    "written": summary.written,
                }),
            ),
            Err(e) => WebhookResponse::from_error(&e),
        }
    }
}

//! Fans webhook batches out to the reconciler.

use crate::error::{SyncError, SyncResult};
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::remote::RemoteSource;
use loansync_protocol::{DataEvent, Event, SubscriptionEventsBatch};
use loansync_storage::{validate_id, ObjectStore};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Counts of what happened to the events of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Raw events received.
    pub events: usize,
    /// Data events reconciled (including ignored stale ones).
    pub reconciled: usize,
    /// Reconciliations that modified the store.
    pub written: usize,
    /// Heartbeats.
    pub pings: usize,
    /// Data events for other object types.
    pub filtered: usize,
    /// Events that could not be decoded.
    pub malformed: usize,
}

/// Something that consumes webhook batches.
///
/// Implemented by [`EventDispatcher`]; the webhook server only depends on
/// this trait.
pub trait BatchHandler: Send + Sync {
    /// Processes one delivered batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch must be redelivered.
    fn handle_batch(&self, batch: &SubscriptionEventsBatch) -> SyncResult<BatchSummary>;
}

/// Dispatches each data event of a batch to the [`Reconciler`], in
/// delivery order.
///
/// A failing event does not stop its siblings: every event is attempted,
/// successful writes stay durable, and the batch is then reported as
/// failed so the sender redelivers it. Redelivery is safe because every
/// reconciliation is idempotent against the state it produced.
pub struct EventDispatcher<S, R> {
    reconciler: Reconciler<S, R>,
    object_type: String,
}

impl<S, R> EventDispatcher<S, R>
where
    S: ObjectStore<Value>,
    R: RemoteSource,
{
    /// Creates a dispatcher reconciling events of `object_type`.
    pub fn new(reconciler: Reconciler<S, R>, object_type: impl Into<String>) -> Self {
        Self {
            reconciler,
            object_type: object_type.into(),
        }
    }

    /// Returns the reconciler.
    pub fn reconciler(&self) -> &Reconciler<S, R> {
        &self.reconciler
    }

    /// Returns the object type whose events are reconciled.
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Processes one batch.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BatchFailed`] if any data event failed to
    /// reconcile. Malformed events are skipped and do not fail the batch.
    pub fn dispatch(&self, batch: &SubscriptionEventsBatch) -> SyncResult<BatchSummary> {
        let mut summary = BatchSummary::default();
        let mut failed = 0;
        let mut retryable = true;
        let mut first_error: Option<SyncError> = None;

        for group in &batch.subscription_events {
            info!(
                subscription_id = %group.subscription_id,
                count = group.events.len(),
                "Received events"
            );

            for decoded in group.decode_events() {
                summary.events += 1;
                let event = match decoded {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(
                            subscription_id = %group.subscription_id,
                            error = %err,
                            "Skipping malformed event"
                        );
                        summary.malformed += 1;
                        continue;
                    }
                };

                let data: DataEvent = match event {
                    Event::Ping(ping) => {
                        debug!(
                            last_delivered_event_id = ping.last_delivered_event_id.as_deref(),
                            "Received ping"
                        );
                        summary.pings += 1;
                        continue;
                    }
                    Event::Create(e) => e.into(),
                    Event::Delete(e) => e.into(),
                    Event::Update(e) => e.into(),
                };

                if data.object_type() != self.object_type {
                    debug!(
                        object_id = data.object_id(),
                        object_type = data.object_type(),
                        "Skipping event for other object type"
                    );
                    summary.filtered += 1;
                    continue;
                }

                if let Err(err) = validate_id(data.object_id()) {
                    warn!(
                        object_id = data.object_id(),
                        event_id = data.event_id(),
                        error = %err,
                        "Skipping event with unusable object id"
                    );
                    summary.malformed += 1;
                    continue;
                }

                match self.reconciler.reconcile(&data) {
                    Ok(outcome) => {
                        summary.reconciled += 1;
                        if outcome.wrote() {
                            summary.written += 1;
                        }
                        if outcome == ReconcileOutcome::Ignored {
                            debug!(object_id = data.object_id(), "Ignored stale update");
                        }
                    }
                    Err(err) => {
                        warn!(
                            object_id = data.object_id(),
                            event_id = data.event_id(),
                            error = %err,
                            retryable = err.is_retryable(),
                            "Failed to reconcile event"
                        );
                        failed += 1;
                        retryable &= err.is_retryable();
                        first_error.get_or_insert(err);
                    }
                }
            }
        }

        if let Some(next_ping_by) = &batch.next_ping_by {
            debug!(%next_ping_by, "Next ping expected");
        }

        if let Some(first) = first_error {
            return Err(SyncError::BatchFailed {
                failed,
                total: summary.events,
                first: first.to_string(),
                retryable,
            });
        }
        Ok(summary)
    }
}

impl<S, R> BatchHandler for EventDispatcher<S, R>
where
    S: ObjectStore<Value>,
    R: RemoteSource,
{
    fn handle_batch(&self, batch: &SubscriptionEventsBatch) -> SyncResult<BatchSummary> {
        self.dispatch(batch)
    }
}

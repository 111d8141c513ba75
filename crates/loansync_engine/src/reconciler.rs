//! Per-object reconciliation.
//!
//! The reconciler decides, for one data event and the store's current view
//! of the affected object, whether to write, patch, refetch, delete or
//! ignore:
//!
//! | event  | local                          | action                  |
//! |--------|--------------------------------|-------------------------|
//! | create | any                            | overwrite               |
//! | delete | any                            | delete                  |
//! | update | absent                         | refetch                 |
//! | update | base token equal               | patch and advance       |
//! | update | base token older than event    | refetch                 |
//! | update | base token newer than event    | ignore                  |
//! | update | base token missing/unreadable  | refetch                 |
//!
//! The base token is `version` when the event carries `objectVersion`,
//! otherwise `updatedAt` compared in whole milliseconds. A patch that fails
//! at any field change is discarded and replaced by a refetch.
//!
//! Calls for the same object id are serialized; calls for different ids
//! run concurrently.

use crate::error::SyncResult;
use crate::locks::KeyedLocks;
use crate::object;
use crate::patch::apply_field_changes;
use crate::remote::RemoteSource;
use loansync_protocol::{DataEvent, ObjectUpdate};
use loansync_storage::ObjectStore;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, warn};

/// Why a reconciliation replaced the local copy with a remote fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchReason {
    /// No local copy to patch.
    Absent,
    /// The local copy is behind the event's base; updates were missed.
    Gap,
    /// The local copy has no usable `version` or `updatedAt`.
    NoBase,
    /// A field change could not be applied.
    PatchFailed,
}

impl fmt::Display for RefetchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Gap => "gap",
            Self::NoBase => "no base",
            Self::PatchFailed => "patch failed",
        })
    }
}

/// Effect of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event's full object was written.
    Created,
    /// The object was deleted.
    Deleted,
    /// The field changes were applied locally.
    Patched,
    /// The object was replaced by a remote fetch (or deleted, if the remote
    /// no longer has it).
    Refetched(RefetchReason),
    /// The event was stale; nothing was written.
    Ignored,
}

impl ReconcileOutcome {
    /// Returns true if the store was modified.
    #[must_use]
    pub fn wrote(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Applies data events to an object store.
///
/// # Example
///
/// ```rust
/// use loansync_engine::{MockRemote, ReconcileOutcome, Reconciler};
/// use loansync_protocol::{DataEvent, ObjectCreate};
/// use loansync_storage::{InMemoryStore, ObjectStore};
/// use serde_json::json;
///
/// let store: InMemoryStore = InMemoryStore::new();
/// let reconciler = Reconciler::new(store, MockRemote::new());
///
/// let event = DataEvent::from(ObjectCreate::new("loan-1", "Loan", json!({"id": "loan-1"})));
/// assert_eq!(reconciler.reconcile(&event)?, ReconcileOutcome::Created);
/// assert!(reconciler.store().read("loan-1")?.is_some());
/// # Ok::<(), loansync_engine::SyncError>(())
/// ```
pub struct Reconciler<S, R> {
    store: S,
    remote: R,
    locks: KeyedLocks,
}

impl<S, R> Reconciler<S, R>
where
    S: ObjectStore<Value>,
    R: RemoteSource,
{
    /// Creates a reconciler writing to `store` and refetching from
    /// `remote`.
    pub fn new(store: S, remote: R) -> Self {
        Self {
            store,
            remote,
            locks: KeyedLocks::new(),
        }
    }

    /// Returns the object store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the remote source.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Reconciles one event against the current local copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the remote fails. Patch failures
    /// are recovered by refetching and are never returned.
    pub fn reconcile(&self, event: &DataEvent) -> SyncResult<ReconcileOutcome> {
        let id = event.object_id();
        let _guard = self.locks.lock(id);

        let outcome = match event {
            DataEvent::Create(create) => {
                self.store.write(id, &create.value)?;
                ReconcileOutcome::Created
            }
            DataEvent::Delete(_) => {
                self.store.delete(id)?;
                ReconcileOutcome::Deleted
            }
            DataEvent::Update(update) => self.reconcile_update(id, update)?,
        };

        debug!(
            object_id = id,
            event_id = event.event_id(),
            kind = event.kind(),
            ?outcome,
            "Reconciled event"
        );
        Ok(outcome)
    }

    fn reconcile_update(&self, id: &str, update: &ObjectUpdate) -> SyncResult<ReconcileOutcome> {
        let Some(local) = self.store.read(id)? else {
            return self.refetch(id, RefetchReason::Absent);
        };

        let ordering = match update.object_version {
            Some(event_version) => object::version(&local).map(|v| v.cmp(&event_version)),
            None => object::updated_at_millis(&local)
                .map(|millis| millis.cmp(&update.object_was_updated_at)),
        };

        match ordering {
            None => self.refetch(id, RefetchReason::NoBase),
            Some(Ordering::Less) => self.refetch(id, RefetchReason::Gap),
            Some(Ordering::Greater) => Ok(ReconcileOutcome::Ignored),
            Some(Ordering::Equal) => self.patch(id, &local, update),
        }
    }

    fn patch(&self, id: &str, local: &Value, update: &ObjectUpdate) -> SyncResult<ReconcileOutcome> {
        let mut patched = match apply_field_changes(&update.field_changes, local) {
            Ok(patched) => patched,
            Err(err) => {
                warn!(object_id = id, error = %err, "Field change failed, refetching object");
                return self.refetch(id, RefetchReason::PatchFailed);
            }
        };

        if !object::advance(&mut patched, update.object_now_updated_at) {
            warn!(
                object_id = id,
                now_updated_at = update.object_now_updated_at,
                "Cannot advance patched object, refetching"
            );
            return self.refetch(id, RefetchReason::PatchFailed);
        }

        self.store.write(id, &patched)?;
        Ok(ReconcileOutcome::Patched)
    }

    fn refetch(&self, id: &str, reason: RefetchReason) -> SyncResult<ReconcileOutcome> {
        debug!(object_id = id, %reason, "Refetching object");
        match self.remote.fetch_object(id)? {
            Some(fetched) => self.store.write(id, &fetched)?,
            None => {
                debug!(object_id = id, "Object no longer exists remotely");
                self.store.delete(id)?;
            }
        }
        Ok(ReconcileOutcome::Refetched(reason))
    }
}

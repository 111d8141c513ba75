//! Delta events.
//!
//! Every event is discriminated by its `__typename`. [`Event`] covers the
//! full feed including heartbeats; [`DataEvent`] is the subset that mutates
//! an object and is what the reconciler consumes.

use crate::field_change::FieldChange;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ownership metadata shared by all data events.
///
/// None of it takes part in reconciliation; it is kept for logging and
/// diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOrigin {
    /// Synchronization root object id, when the object is not a root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_object_id: Option<String>,
    /// Synchronization root object type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_object_type: Option<String>,
    /// Synchronization root object version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_object_version: Option<i64>,
    /// Conceptual root object id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_object_id: Option<String>,
    /// Conceptual root object type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_object_type: Option<String>,
    /// Owning organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Acting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Associated activity object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
}

/// Liveness heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingEvent {
    /// Last data event the sender believes was delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_delivered_event_id: Option<String>,
}

/// A new object, carried in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCreate {
    /// Diagnostic event id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Id of the created object.
    pub object_id: String,
    /// Type of the created object.
    pub object_type: String,
    /// Creation instant in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_created_at: Option<i64>,
    /// Full object representation.
    pub value: Value,
    /// Ownership metadata.
    #[serde(flatten)]
    pub origin: EventOrigin,
}

impl ObjectCreate {
    /// Creates an event for `object_id` carrying `value`.
    pub fn new(object_id: impl Into<String>, object_type: impl Into<String>, value: Value) -> Self {
        Self {
            event_id: None,
            object_id: object_id.into(),
            object_type: object_type.into(),
            object_created_at: None,
            value,
            origin: EventOrigin::default(),
        }
    }
}

/// A deleted object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDelete {
    /// Diagnostic event id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Id of the deleted object.
    pub object_id: String,
    /// Type of the deleted object.
    pub object_type: String,
    /// Version at deletion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_version: Option<i64>,
    /// Deletion instant in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_deleted_at: Option<i64>,
    /// Object representation at deletion.
    #[serde(default)]
    pub old_value: Value,
    /// Ownership metadata.
    #[serde(flatten)]
    pub origin: EventOrigin,
}

impl ObjectDelete {
    /// Creates an event deleting `object_id`.
    pub fn new(object_id: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            event_id: None,
            object_id: object_id.into(),
            object_type: object_type.into(),
            object_version: None,
            object_deleted_at: None,
            old_value: Value::Null,
            origin: EventOrigin::default(),
        }
    }
}

/// Field-level changes to an existing object.
///
/// `object_version` and `object_was_updated_at` describe the base the
/// changes were computed against; `object_now_updated_at` is the object's
/// `updatedAt` after they are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUpdate {
    /// Diagnostic event id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Id of the updated object.
    pub object_id: String,
    /// Type of the updated object.
    pub object_type: String,
    /// Version before the update, when the source tracks versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_version: Option<i64>,
    /// `updatedAt` before the update, in epoch milliseconds.
    pub object_was_updated_at: i64,
    /// `updatedAt` after the update, in epoch milliseconds.
    pub object_now_updated_at: i64,
    /// Changes, applied in order.
    #[serde(default)]
    pub field_changes: Vec<FieldChange>,
    /// Ownership metadata.
    #[serde(flatten)]
    pub origin: EventOrigin,
}

impl ObjectUpdate {
    /// Creates a timestamp-mode update (no version).
    pub fn new(
        object_id: impl Into<String>,
        object_type: impl Into<String>,
        was_updated_at: i64,
        now_updated_at: i64,
        field_changes: Vec<FieldChange>,
    ) -> Self {
        Self {
            event_id: None,
            object_id: object_id.into(),
            object_type: object_type.into(),
            object_version: None,
            object_was_updated_at: was_updated_at,
            object_now_updated_at: now_updated_at,
            field_changes,
            origin: EventOrigin::default(),
        }
    }

    /// Sets the base version the changes apply to.
    #[must_use]
    pub fn with_version(mut self, version: i64) -> Self {
        self.object_version = Some(version);
        self
    }
}

/// An event that mutates one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum DataEvent {
    /// Object created.
    #[serde(rename = "ObjectCreate")]
    Create(ObjectCreate),
    /// Object deleted.
    #[serde(rename = "ObjectDelete")]
    Delete(ObjectDelete),
    /// Object updated.
    #[serde(rename = "ObjectUpdate")]
    Update(ObjectUpdate),
}

impl DataEvent {
    /// Returns the id of the affected object.
    #[must_use]
    pub fn object_id(&self) -> &str {
        match self {
            Self::Create(e) => &e.object_id,
            Self::Delete(e) => &e.object_id,
            Self::Update(e) => &e.object_id,
        }
    }

    /// Returns the type of the affected object.
    #[must_use]
    pub fn object_type(&self) -> &str {
        match self {
            Self::Create(e) => &e.object_type,
            Self::Delete(e) => &e.object_type,
            Self::Update(e) => &e.object_type,
        }
    }

    /// Returns the diagnostic event id, if any.
    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Create(e) => e.event_id.as_deref(),
            Self::Delete(e) => e.event_id.as_deref(),
            Self::Update(e) => e.event_id.as_deref(),
        }
    }

    /// Returns the wire discriminator.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "ObjectCreate",
            Self::Delete(_) => "ObjectDelete",
            Self::Update(_) => "ObjectUpdate",
        }
    }
}

impl From<ObjectCreate> for DataEvent {
    fn from(event: ObjectCreate) -> Self {
        Self::Create(event)
    }
}

impl From<ObjectDelete> for DataEvent {
    fn from(event: ObjectDelete) -> Self {
        Self::Delete(event)
    }
}

impl From<ObjectUpdate> for DataEvent {
    fn from(event: ObjectUpdate) -> Self {
        Self::Update(event)
    }
}

/// Any event in a subscription feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum Event {
    /// Heartbeat.
    #[serde(rename = "PingEvent")]
    Ping(PingEvent),
    /// Object created.
    #[serde(rename = "ObjectCreate")]
    Create(ObjectCreate),
    /// Object deleted.
    #[serde(rename = "ObjectDelete")]
    Delete(ObjectDelete),
    /// Object updated.
    #[serde(rename = "ObjectUpdate")]
    Update(ObjectUpdate),
}

impl Event {
    /// Converts to a [`DataEvent`], or `None` for heartbeats.
    #[must_use]
    pub fn into_data(self) -> Option<DataEvent> {
        match self {
            Self::Ping(_) => None,
            Self::Create(e) => Some(DataEvent::Create(e)),
            Self::Delete(e) => Some(DataEvent::Delete(e)),
            Self::Update(e) => Some(DataEvent::Update(e)),
        }
    }
}

impl From<DataEvent> for Event {
    fn from(event: DataEvent) -> Self {
        match event {
            DataEvent::Create(e) => Self::Create(e),
            DataEvent::Delete(e) => Self::Delete(e),
            DataEvent::Update(e) => Self::Update(e),
        }
    }
}

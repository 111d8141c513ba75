//! Webhook delivery envelope.

use crate::error::{ProtocolError, ProtocolResult};
use crate::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of `__typename` that marks a body as an event batch.
pub const BATCH_TYPENAME: &str = "SubscriptionEventsBatch";

/// Events delivered for one subscription.
///
/// Events are kept as raw JSON so that one malformed entry can be reported
/// and skipped while its siblings are still processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEvents {
    /// Subscription the events belong to.
    pub subscription_id: String,
    /// Raw events, in delivery order.
    #[serde(default)]
    pub events: Vec<Value>,
}

impl SubscriptionEvents {
    /// Creates a group from typed events.
    ///
    /// # Errors
    ///
    /// Returns an error if an event cannot be encoded.
    pub fn new(subscription_id: impl Into<String>, events: Vec<Event>) -> ProtocolResult<Self> {
        let events = events
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            subscription_id: subscription_id.into(),
            events,
        })
    }

    /// Decodes each event independently, preserving order.
    pub fn decode_events(&self) -> Vec<ProtocolResult<Event>> {
        self.events.iter().map(decode_event).collect()
    }
}

/// Decodes one raw event.
fn decode_event(raw: &Value) -> ProtocolResult<Event> {
    let kind = raw
        .get("__typename")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();
    Event::deserialize(raw).map_err(|e| ProtocolError::malformed(format!("{kind}: {e}")))
}

/// Body of one webhook delivery.
///
/// # Example
///
/// ```rust
/// use loansync_protocol::SubscriptionEventsBatch;
///
/// let body = br#"{
///     "__typename": "SubscriptionEventsBatch",
///     "subscriptionEvents": [
///         {"subscriptionId": "s1", "events": [{"__typename": "PingEvent"}]}
///     ]
/// }"#;
/// let batch = SubscriptionEventsBatch::from_slice(body).unwrap();
/// assert_eq!(batch.event_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEventsBatch {
    /// Always [`BATCH_TYPENAME`].
    #[serde(rename = "__typename")]
    pub typename: String,
    /// Events grouped by subscription.
    #[serde(default)]
    pub subscription_events: Vec<SubscriptionEvents>,
    /// When the next heartbeat is due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_ping_by: Option<String>,
}

impl SubscriptionEventsBatch {
    /// Creates a batch from event groups.
    #[must_use]
    pub fn new(subscription_events: Vec<SubscriptionEvents>) -> Self {
        Self {
            typename: BATCH_TYPENAME.to_string(),
            subscription_events,
            next_ping_by: None,
        }
    }

    /// Decodes a request body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if the body is not JSON and
    /// [`ProtocolError::MissingMarker`] if it is not marked as a batch.
    pub fn from_slice(body: &[u8]) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    /// Decodes an already-parsed body.
    ///
    /// # Errors
    ///
    /// See [`SubscriptionEventsBatch::from_slice`].
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        if value.get("__typename").and_then(Value::as_str) != Some(BATCH_TYPENAME) {
            return Err(ProtocolError::MissingMarker);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Encodes the batch as a request body.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Total number of raw events across all subscriptions.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.subscription_events.iter().map(|s| s.events.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DataEvent, ObjectCreate, PingEvent};
    use serde_json::json;

    #[test]
    fn rejects_missing_marker() {
        let result = SubscriptionEventsBatch::from_slice(br#"{"subscriptionEvents": []}"#);
        assert!(matches!(result, Err(ProtocolError::MissingMarker)));

        let result = SubscriptionEventsBatch::from_slice(br#"{"__typename": "Other"}"#);
        assert!(matches!(result, Err(ProtocolError::MissingMarker)));

        let result = SubscriptionEventsBatch::from_slice(b"[1, 2]");
        assert!(matches!(result, Err(ProtocolError::MissingMarker)));
    }

    #[test]
    fn rejects_invalid_json() {
        let result = SubscriptionEventsBatch::from_slice(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Json(_))));
    }

    #[test]
    fn malformed_event_does_not_poison_siblings() {
        let batch = SubscriptionEventsBatch::from_value(json!({
            "__typename": "SubscriptionEventsBatch",
            "nextPingBy": "2024-01-01T00:05:00.000Z",
            "subscriptionEvents": [{
                "subscriptionId": "s1",
                "events": [
                    {"__typename": "ObjectExplode", "objectId": "x"},
                    {"__typename": "ObjectCreate", "objectId": "a", "objectType": "Loan", "value": {}},
                    {"objectId": "untagged"}
                ]
            }]
        }))
        .unwrap();

        assert_eq!(batch.next_ping_by.as_deref(), Some("2024-01-01T00:05:00.000Z"));
        let decoded = batch.subscription_events[0].decode_events();
        assert_eq!(decoded.len(), 3);
        match &decoded[0] {
            Err(ProtocolError::MalformedEvent { message }) => {
                assert!(message.starts_with("ObjectExplode"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(decoded[1].is_ok());
        match &decoded[2] {
            Err(ProtocolError::MalformedEvent { message }) => {
                assert!(message.starts_with("<missing>"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn encode_then_decode() {
        let events = vec![
            Event::Ping(PingEvent::default()),
            Event::from(DataEvent::from(ObjectCreate::new("a", "Loan", json!({"id": "a"})))),
        ];
        let batch = SubscriptionEventsBatch::new(vec![SubscriptionEvents::new("s1", events.clone()).unwrap()]);
        let decoded = SubscriptionEventsBatch::from_slice(&batch.encode().unwrap()).unwrap();

        assert_eq!(decoded.event_count(), 2);
        let typed: Vec<Event> = decoded.subscription_events[0]
            .decode_events()
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(typed, events);
    }
}

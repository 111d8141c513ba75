//! Field-level edits carried by an object update.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a [`FieldChange`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldChangeKind {
    /// `FieldCreate`
    Create,
    /// `FieldUpdate`
    Update,
    /// `FieldDelete`
    Delete,
    /// `FieldAppend`
    Append,
}

impl FieldChangeKind {
    /// Returns the wire discriminator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "FieldCreate",
            Self::Update => "FieldUpdate",
            Self::Delete => "FieldDelete",
            Self::Append => "FieldAppend",
        }
    }
}

impl fmt::Display for FieldChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edit to a field of an object, addressed by a selector.
///
/// `old_value` is informational only; it is never checked against the
/// local copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum FieldChange {
    /// The field is expected to be empty and receives `value`.
    #[serde(rename = "FieldCreate")]
    Create {
        /// Path of the field.
        selector: String,
        /// Initial value.
        value: Value,
    },

    /// The field is replaced with `value`.
    #[serde(rename = "FieldUpdate")]
    Update {
        /// Path of the field.
        selector: String,
        /// Value before the update.
        #[serde(rename = "oldValue", default)]
        old_value: Value,
        /// Value after the update.
        value: Value,
    },

    /// The field or array element is removed.
    #[serde(rename = "FieldDelete")]
    Delete {
        /// Path of the field.
        selector: String,
        /// Value at the time of deletion.
        #[serde(rename = "oldValue", default)]
        old_value: Value,
    },

    /// `value` is appended to the array at the selector.
    #[serde(rename = "FieldAppend")]
    Append {
        /// Path of the array.
        selector: String,
        /// Appended element.
        value: Value,
    },
}

impl FieldChange {
    /// Creates a `FieldCreate` change.
    pub fn create(selector: impl Into<String>, value: Value) -> Self {
        Self::Create {
            selector: selector.into(),
            value,
        }
    }

    /// Creates a `FieldUpdate` change.
    pub fn update(selector: impl Into<String>, old_value: Value, value: Value) -> Self {
        Self::Update {
            selector: selector.into(),
            old_value,
            value,
        }
    }

    /// Creates a `FieldDelete` change.
    pub fn delete(selector: impl Into<String>, old_value: Value) -> Self {
        Self::Delete {
            selector: selector.into(),
            old_value,
        }
    }

    /// Creates a `FieldAppend` change.
    pub fn append(selector: impl Into<String>, value: Value) -> Self {
        Self::Append {
            selector: selector.into(),
            value,
        }
    }

    /// Returns the change kind.
    #[must_use]
    pub fn kind(&self) -> FieldChangeKind {
        match self {
            Self::Create { .. } => FieldChangeKind::Create,
            Self::Update { .. } => FieldChangeKind::Update,
            Self::Delete { .. } => FieldChangeKind::Delete,
            Self::Append { .. } => FieldChangeKind::Append,
        }
    }

    /// Returns the selector text.
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Create { selector, .. }
            | Self::Update { selector, .. }
            | Self::Delete { selector, .. }
            | Self::Append { selector, .. } => selector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_each_kind() {
        let changes: Vec<FieldChange> = serde_json::from_value(json!([
            {"__typename": "FieldCreate", "selector": "a", "value": 1},
            {"__typename": "FieldUpdate", "selector": "b", "oldValue": 1, "value": 2},
            {"__typename": "FieldDelete", "selector": "c", "oldValue": "x"},
            {"__typename": "FieldAppend", "selector": "d", "value": {"k": true}},
        ]))
        .unwrap();

        assert_eq!(
            changes,
            vec![
                FieldChange::create("a", json!(1)),
                FieldChange::update("b", json!(1), json!(2)),
                FieldChange::delete("c", json!("x")),
                FieldChange::append("d", json!({"k": true})),
            ]
        );
        let kinds: Vec<_> = changes.iter().map(FieldChange::kind).collect();
        assert_eq!(
            kinds,
            vec![
                FieldChangeKind::Create,
                FieldChangeKind::Update,
                FieldChangeKind::Delete,
                FieldChangeKind::Append,
            ]
        );
    }

    #[test]
    fn missing_old_value_is_null() {
        let change: FieldChange =
            serde_json::from_value(json!({"__typename": "FieldDelete", "selector": "a"})).unwrap();
        assert_eq!(change, FieldChange::delete("a", Value::Null));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result: Result<FieldChange, _> =
            serde_json::from_value(json!({"__typename": "FieldMove", "selector": "a"}));
        assert!(result.is_err());
    }

    #[test]
    fn encodes_wire_names() {
        let encoded = serde_json::to_value(FieldChange::update("x", json!(1), json!(2))).unwrap();
        assert_eq!(
            encoded,
            json!({"__typename": "FieldUpdate", "selector": "x", "oldValue": 1, "value": 2})
        );
        assert_eq!(FieldChangeKind::Append.to_string(), "FieldAppend");
    }
}

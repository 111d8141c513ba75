//! Causality tokens of stored objects.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Returns the object's `id`.
#[must_use]
pub fn object_id(object: &Value) -> Option<&str> {
    object.get("id").and_then(Value::as_str)
}

/// Returns the object's integer `version`.
#[must_use]
pub fn version(object: &Value) -> Option<i64> {
    object.get("version").and_then(Value::as_i64)
}

/// Returns the object's `updatedAt` as epoch milliseconds.
#[must_use]
pub fn updated_at_millis(object: &Value) -> Option<i64> {
    let text = object.get("updatedAt")?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|instant| instant.timestamp_millis())
}

/// Formats epoch milliseconds as an ISO-8601 UTC timestamp with
/// millisecond precision.
#[must_use]
pub fn format_millis(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Records that one update was applied: bumps `version` when present and
/// sets `updatedAt`.
///
/// Returns `false` (leaving `object` untouched) if it is not a JSON object
/// or the instant cannot be represented.
pub fn advance(object: &mut Value, now_updated_at: i64) -> bool {
    let Some(updated_at) = format_millis(now_updated_at) else {
        return false;
    };
    let next_version = version(object).map(|v| v.saturating_add(1));
    let Value::Object(map) = object else {
        return false;
    };
    if let Some(next) = next_version {
        map.insert("version".to_string(), Value::from(next));
    }
    map.insert("updatedAt".to_string(), Value::String(updated_at));
    true
}

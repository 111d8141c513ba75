//! Field-level patch engine.
//!
//! A [`FieldChange`] is applied in two steps: its selector is resolved
//! against the target tree into an [`Accessor`], then the change kind
//! decides what to do with the value at that location.
//!
//! Resolution rules:
//!
//! - every segment but the last must name an existing value
//! - a last object property may be absent (reads as `None`, set inserts)
//! - a last array index may equal the array length (reads as `None`, set
//!   appends); negative indexes count from the end
//! - `["id"]` on an array and `[key="value"]` must match an element
//!
//! The engine knows nothing about versions or object identity.

use crate::error::{PatchError, PatchResult};
use loansync_protocol::{FieldChange, Selector, SelectorSegment};
use serde_json::Value;

/// Location of the final segment within its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Field(String),
    Element(usize),
}

/// Get/set/delete access to one location in a value tree.
#[derive(Debug)]
pub struct Accessor<'a> {
    parent: &'a mut Value,
    slot: Slot,
    path: String,
}

impl<'a> Accessor<'a> {
    /// Resolves `selector` against `root`.
    ///
    /// # Errors
    ///
    /// Returns the shortest unresolvable prefix of the selector.
    pub fn resolve(selector: &Selector, root: &'a mut Value) -> Result<Self, String> {
        let segments = selector.segments();
        let Some((last, init)) = segments.split_last() else {
            return Err(String::new());
        };

        let mut current = root;
        for (i, segment) in init.iter().enumerate() {
            current = match step(current, segment) {
                Some(next) => next,
                None => return Err(selector.prefix(i + 1)),
            };
        }

        match slot(current, last) {
            Some(slot) => Ok(Self {
                parent: current,
                slot,
                path: selector.to_string(),
            }),
            None => Err(selector.to_string()),
        }
    }

    /// Returns the selector this accessor was resolved from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the current value, or `None` if the location is empty.
    #[must_use]
    pub fn get(&self) -> Option<&Value> {
        match (&*self.parent, &self.slot) {
            (Value::Object(map), Slot::Field(name)) => map.get(name),
            (Value::Array(items), Slot::Element(index)) => items.get(*index),
            _ => None,
        }
    }

    /// Stores `value` at the location.
    pub fn set(&mut self, value: Value) {
        match (&mut *self.parent, &self.slot) {
            (Value::Object(map), Slot::Field(name)) => {
                map.insert(name.clone(), value);
            }
            (Value::Array(items), Slot::Element(index)) => {
                if *index < items.len() {
                    items[*index] = value;
                } else {
                    items.push(value);
                }
            }
            _ => {}
        }
    }

    /// Removes the value at the location, returning it.
    ///
    /// Removing an array element shifts the elements after it.
    pub fn delete(&mut self) -> Option<Value> {
        match (&mut *self.parent, &self.slot) {
            (Value::Object(map), Slot::Field(name)) => map.remove(name),
            (Value::Array(items), Slot::Element(index)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }
}

/// Descends into an existing child.
fn step<'v>(value: &'v mut Value, segment: &SelectorSegment) -> Option<&'v mut Value> {
    match (value, segment) {
        (Value::Object(map), SelectorSegment::Property(name) | SelectorSegment::Key(name)) => {
            map.get_mut(name)
        }
        (Value::Array(items), SelectorSegment::Index(index)) => {
            let index = normalize_index(*index, items.len())?;
            items.get_mut(index)
        }
        (Value::Array(items), SelectorSegment::Key(id)) => {
            items.iter_mut().find(|item| field_equals(item, "id", id))
        }
        (Value::Array(items), SelectorSegment::Match { key, value }) => {
            items.iter_mut().find(|item| field_equals(item, key, value))
        }
        _ => None,
    }
}

/// Resolves the final segment without requiring it to exist.
fn slot(parent: &Value, segment: &SelectorSegment) -> Option<Slot> {
    match (parent, segment) {
        (Value::Object(_), SelectorSegment::Property(name) | SelectorSegment::Key(name)) => {
            Some(Slot::Field(name.clone()))
        }
        (Value::Array(items), SelectorSegment::Index(index)) => {
            let len = items.len();
            let index = if *index < 0 {
                normalize_index(*index, len)?
            } else {
                usize::try_from(*index).ok().filter(|i| *i <= len)?
            };
            Some(Slot::Element(index))
        }
        (Value::Array(items), SelectorSegment::Key(id)) => items
            .iter()
            .position(|item| field_equals(item, "id", id))
            .map(Slot::Element),
        (Value::Array(items), SelectorSegment::Match { key, value }) => items
            .iter()
            .position(|item| field_equals(item, key, value))
            .map(Slot::Element),
        _ => None,
    }
}

/// Maps an index to an existing element position.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    if index < 0 {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    } else {
        usize::try_from(index).ok().filter(|i| *i < len)
    }
}

fn field_equals(item: &Value, key: &str, expected: &str) -> bool {
    item.get(key).and_then(Value::as_str) == Some(expected)
}

/// Returns the JSON type name of `value`.
#[must_use]
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Applies one field change to `target` in place.
///
/// On error `target` may be partially modified and must be discarded.
///
/// # Errors
///
/// Returns [`PatchError::Selector`] if the selector does not parse or
/// resolve, and [`PatchError::Precondition`] if a create finds an existing
/// value or an append finds a non-array.
///
/// # Example
///
/// ```rust
/// use loansync_engine::apply_field_change;
/// use loansync_protocol::FieldChange;
/// use serde_json::json;
///
/// let mut loan = json!({"id": "loan-1", "fees": null});
/// apply_field_change(&FieldChange::append("fees", json!(25)), &mut loan).unwrap();
/// assert_eq!(loan["fees"], json!([25]));
/// ```
pub fn apply_field_change(change: &FieldChange, target: &mut Value) -> PatchResult<()> {
    let kind = change.kind();
    let selector = Selector::parse(change.selector()).map_err(|_| PatchError::Selector {
        kind,
        path: change.selector().to_string(),
    })?;
    let mut accessor =
        Accessor::resolve(&selector, target).map_err(|path| PatchError::Selector { kind, path })?;

    match change {
        FieldChange::Create { value, .. } => {
            if let Some(found) = accessor.get().filter(|v| !v.is_null()).map(json_type) {
                return Err(PatchError::Precondition {
                    kind,
                    path: accessor.path().to_string(),
                    found,
                });
            }
            accessor.set(value.clone());
        }
        FieldChange::Delete { .. } => {
            accessor.delete();
        }
        FieldChange::Update { value, .. } => {
            accessor.set(value.clone());
        }
        FieldChange::Append { value, .. } => {
            let next = match accessor.get() {
                Some(Value::Array(items)) => {
                    let mut next = Vec::with_capacity(items.len() + 1);
                    next.extend(items.iter().cloned());
                    next.push(value.clone());
                    next
                }
                None | Some(Value::Null) => vec![value.clone()],
                Some(other) => {
                    return Err(PatchError::Precondition {
                        kind,
                        path: accessor.path().to_string(),
                        found: json_type(other),
                    });
                }
            };
            accessor.set(Value::Array(next));
        }
    }
    Ok(())
}

/// Applies `changes` in order to a copy of `target`.
///
/// Returns the patched copy only if every change applied; `target` itself
/// is never modified.
///
/// # Errors
///
/// Returns the first failing change's error.
pub fn apply_field_changes(changes: &[FieldChange], target: &Value) -> PatchResult<Value> {
    let mut patched = target.clone();
    for change in changes {
        apply_field_change(change, &mut patched)?;
    }
    Ok(patched)
}

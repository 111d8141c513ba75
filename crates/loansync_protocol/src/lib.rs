//! # loansync protocol
//!
//! Wire types for the delta-event webhook feed.
//!
//! This crate provides:
//! - [`SubscriptionEventsBatch`], the body of one webhook delivery
//! - [`Event`] / [`DataEvent`], the closed set of delta events
//! - [`FieldChange`], the field-level edits carried by an update
//! - [`Selector`], the parsed path a field change addresses
//!
//! This is a pure protocol crate with no I/O operations. Events are decoded
//! one at a time so a single malformed event never poisons its siblings.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod error;
mod event;
mod field_change;
mod selector;

pub use batch::{SubscriptionEvents, SubscriptionEventsBatch, BATCH_TYPENAME};
pub use error::{ProtocolError, ProtocolResult};
pub use event::{
    DataEvent, Event, EventOrigin, ObjectCreate, ObjectDelete, ObjectUpdate, PingEvent,
};
pub use field_change::{FieldChange, FieldChangeKind};
pub use selector::{Selector, SelectorSegment};

//! Change notification
//!
//! Observable records embed a [`ChangeSupport`] and announce attribute
//! updates through it. The indexer subscribes one listener per member record
//! via the [`EventBridge`].
//!
//! Only changes to the attribute named in the event are observable. A
//! change deeper inside a nested record, or to an intermediate step of a
//! chained path, is not announced to the root record's listeners.

mod bridge;
mod support;

pub use bridge::EventBridge;
pub use support::{ChangeSupport, Observable, PropertyChangeEvent, PropertyChangeListener};

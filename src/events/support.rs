//! Listener registry embedded in observable records

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::properties::Value;

/// An attribute of a record changed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChangeEvent {
    /// Name of the changed attribute
    pub property: String,
    /// Value before the change (`None` if unset)
    pub old: Option<Value>,
    /// Value after the change (`None` if unset)
    pub new: Option<Value>,
}

/// Receives change events from a record.
pub trait PropertyChangeListener: Send + Sync {
    /// Called synchronously on the thread that mutated the record
    fn property_change(&self, event: &PropertyChangeEvent);
}

impl<F> PropertyChangeListener for F
where
    F: Fn(&PropertyChangeEvent) + Send + Sync,
{
    fn property_change(&self, event: &PropertyChangeEvent) {
        self(event)
    }
}

/// Records that announce attribute changes.
pub trait Observable {
    /// The record's listener registry
    fn change_support(&self) -> &ChangeSupport;
}

/// Listener registry for one record.
///
/// Listeners are compared by `Arc` identity. Delivery happens after the
/// registry lock is released, so a listener may add or remove listeners.
#[derive(Default)]
pub struct ChangeSupport {
    listeners: Mutex<Vec<Arc<dyn PropertyChangeListener>>>,
}

impl ChangeSupport {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn add_listener(&self, listener: Arc<dyn PropertyChangeListener>) {
        self.listeners.lock().push(listener);
    }

    /// Unregister a listener, returning whether it was registered
    pub fn remove_listener(&self, listener: &Arc<dyn PropertyChangeListener>) -> bool {
        let mut listeners = self.listeners.lock();
        match listeners.iter().position(|l| same_listener(l, listener)) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Announce a change between two set values
    pub fn fire(&self, property: &str, old: impl Into<Value>, new: impl Into<Value>) {
        self.fire_optional(property, Some(old.into()), Some(new.into()));
    }

    /// Announce a change where either side may be unset.
    ///
    /// Nothing is delivered when old and new are equal.
    pub fn fire_optional(&self, property: &str, old: Option<Value>, new: Option<Value>) {
        if old == new {
            return;
        }

        let snapshot: Vec<_> = self.listeners.lock().clone();
        if snapshot.is_empty() {
            return;
        }

        let event = PropertyChangeEvent {
            property: property.to_string(),
            old,
            new,
        };
        for listener in snapshot {
            listener.property_change(&event);
        }
    }
}

impl fmt::Debug for ChangeSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSupport")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn same_listener(a: &Arc<dyn PropertyChangeListener>, b: &Arc<dyn PropertyChangeListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

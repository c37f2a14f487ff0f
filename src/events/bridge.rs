//! Subscription glue between record types and listeners
//!
//! Types that did not declare `.observable()` in their attribute table are
//! unsupported: subscribing is a no-op and indexes over them only reflect
//! explicit add/remove.

use std::any::Any;
use std::sync::Arc;

use super::support::PropertyChangeListener;
use crate::properties::BeanType;

/// Subscribes listeners on instances of one observable type.
#[derive(Debug, Clone)]
pub struct EventBridge {
    bean_type: Arc<BeanType>,
}

impl EventBridge {
    /// Whether instances of the type announce attribute changes
    pub fn supports(bean_type: &BeanType) -> bool {
        bean_type.is_observable()
    }

    /// Bridge for an observable type, `None` otherwise
    pub fn for_type(bean_type: Arc<BeanType>) -> Option<Self> {
        if Self::supports(&bean_type) {
            Some(Self { bean_type })
        } else {
            None
        }
    }

    /// Type this bridge serves
    pub fn bean_type(&self) -> &Arc<BeanType> {
        &self.bean_type
    }

    /// Register a listener on an instance.
    ///
    /// Returns false if the instance is not of the bridged type.
    pub fn subscribe(&self, instance: &dyn Any, listener: Arc<dyn PropertyChangeListener>) -> bool {
        match self.bean_type.change_support(instance) {
            Some(support) => {
                support.add_listener(listener);
                true
            }
            None => false,
        }
    }

    /// Unregister a listener from an instance
    pub fn unsubscribe(&self, instance: &dyn Any, listener: &Arc<dyn PropertyChangeListener>) -> bool {
        self.bean_type
            .change_support(instance)
            .is_some_and(|support| support.remove_listener(listener))
    }
}

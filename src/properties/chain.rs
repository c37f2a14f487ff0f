//! Resolved attribute paths and their evaluation
//!
//! A chain is an ordered list of single-step accessors. Evaluation is lazy:
//! [`PathValues`] walks the attribute tree depth-first, expanding
//! collection-valued steps into their elements and dropping absent
//! intermediates instead of failing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::types::{Attribute, PropertyDescriptor};
use super::value::{Value, ValueKind};

/// One accessor in a chain.
#[derive(Debug, Clone)]
pub struct Step {
    descriptor: Arc<PropertyDescriptor>,
    flattening: bool,
}

impl Step {
    pub(crate) fn new(descriptor: Arc<PropertyDescriptor>) -> Self {
        let flattening = descriptor.kind().is_collection();
        Self {
            descriptor,
            flattening,
        }
    }

    /// Attribute read by this step
    pub fn descriptor(&self) -> &Arc<PropertyDescriptor> {
        &self.descriptor
    }

    /// Whether this step expands one instance into many
    pub fn is_flattening(&self) -> bool {
        self.flattening
    }
}

/// A dotted attribute path resolved against a record type.
pub struct PropertyChain {
    owner: &'static str,
    path: String,
    steps: Vec<Step>,
}

impl PropertyChain {
    pub(crate) fn new(owner: &'static str, path: &str, steps: Vec<Step>) -> Self {
        Self {
            owner,
            path: path.to_string(),
            steps,
        }
    }

    /// Root type name
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Dotted path as resolved
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Accessors, root first
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of accessors
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a resolved chain
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// True if any step expands a collection
    pub fn is_flattening(&self) -> bool {
        self.steps.iter().any(Step::is_flattening)
    }

    /// Kind of the values produced at the end of the chain
    pub fn terminal_kind(&self) -> ValueKind {
        self.steps
            .last()
            .map_or(ValueKind::Mixed, |s| s.descriptor.kind().value_kind())
    }

    /// Lazily evaluate the chain against a record.
    ///
    /// A chain without flattening steps yields at most one value.
    pub fn values<'c>(&'c self, record: &dyn Any) -> PathValues<'c> {
        let mut pending = Vec::new();
        if let Some(first) = self.steps.first() {
            pending.push((1, first.descriptor.read(record)));
        }
        PathValues {
            chain: self,
            pending,
        }
    }

    /// Evaluate into a vector
    pub fn collect_values(&self, record: &dyn Any) -> Vec<Value> {
        self.values(record).collect()
    }
}

impl fmt::Debug for PropertyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChain")
            .field("owner", &self.owner)
            .field("path", &self.path)
            .field("flattening", &self.is_flattening())
            .finish()
    }
}

/// Lazy sequence of the values a chain produces for one record.
pub struct PathValues<'c> {
    chain: &'c PropertyChain,
    // (steps already applied, attribute read by the last of them)
    pending: Vec<(usize, Attribute)>,
}

impl Iterator for PathValues<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let total = self.chain.steps.len();

        while let Some((depth, attribute)) = self.pending.pop() {
            match attribute {
                Attribute::Absent => {}
                Attribute::Many(items) => {
                    // Reverse so elements come out in collection order.
                    self.pending
                        .extend(items.into_iter().rev().map(|item| (depth, item)));
                }
                Attribute::Value(value) if depth == total => return Some(value),
                // A scalar in the middle of a chain has nothing to descend into.
                Attribute::Value(_) => {}
                Attribute::Bean(bean) if depth == total => return Some(Value::Ref(bean)),
                Attribute::Bean(bean) => {
                    let next = self.chain.steps[depth].descriptor.read(bean.as_any());
                    self.pending.push((depth + 1, next));
                }
            }
        }

        None
    }
}

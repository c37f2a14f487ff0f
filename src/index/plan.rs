//! Declarative index plans
//!
//! A plan maps attribute paths to directives and names a default for the
//! attributes it does not mention. Applying a plan walks the record type's
//! attribute table:
//!
//! - Scalar attributes (and collections of scalars) get their directive, or
//!   the default
//! - Nested record attributes are skipped unless a directive names them;
//!   `Recurse` walks the nested type under the dotted prefix
//! - Directives on paths the walk never reached (below a nested attribute
//!   that was not recursed into) are resolved and applied directly

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::buckets::Comparator;
use super::errors::{IndexError, IndexResult};
use super::indexer::BeanIndexer;
use super::mode::Mode;
use super::record::Record;
use crate::observability::{self, Event};
use crate::properties::{introspector, BeanType, PropertyKind, Value};

/// What to do with one attribute path
#[derive(Clone)]
pub enum IndexDirective {
    /// Leave unindexed
    Skip,
    /// Unsorted index
    Unsorted,
    /// Sorted index under natural value order
    Sorted,
    /// Sorted index under a comparator
    SortedWith(Comparator),
    /// Walk the attributes of the nested record type
    Recurse,
}

impl fmt::Debug for IndexDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDirective::Skip => f.write_str("Skip"),
            IndexDirective::Unsorted => f.write_str("Unsorted"),
            IndexDirective::Sorted => f.write_str("Sorted"),
            IndexDirective::SortedWith(_) => f.write_str("SortedWith(..)"),
            IndexDirective::Recurse => f.write_str("Recurse"),
        }
    }
}

/// Directive for scalar attributes a plan does not mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultDirective {
    #[default]
    Skip,
    Unsorted,
    /// Sorted where the attribute is naturally orderable, unsorted otherwise
    Sorted,
}

/// Attribute path -> directive, plus a default.
#[derive(Debug, Clone, Default)]
pub struct IndexPlan {
    default: DefaultDirective,
    directives: BTreeMap<String, IndexDirective>,
}

impl IndexPlan {
    /// Empty plan that indexes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Directive for unmentioned scalar attributes
    pub fn with_default(mut self, default: DefaultDirective) -> Self {
        self.default = default;
        self
    }

    /// Set the directive for `path`, replacing any earlier one
    pub fn path(mut self, path: impl Into<String>, directive: IndexDirective) -> Self {
        self.directives.insert(path.into(), directive);
        self
    }

    pub fn skip(self, path: impl Into<String>) -> Self {
        self.path(path, IndexDirective::Skip)
    }

    pub fn unsorted(self, path: impl Into<String>) -> Self {
        self.path(path, IndexDirective::Unsorted)
    }

    pub fn sorted(self, path: impl Into<String>) -> Self {
        self.path(path, IndexDirective::Sorted)
    }

    pub fn sorted_by<F>(self, path: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.path(path, IndexDirective::SortedWith(Arc::new(compare)))
    }

    pub fn recurse(self, path: impl Into<String>) -> Self {
        self.path(path, IndexDirective::Recurse)
    }

    pub fn default_directive(&self) -> DefaultDirective {
        self.default
    }

    pub fn directive(&self, path: &str) -> Option<&IndexDirective> {
        self.directives.get(path)
    }

    /// Create the plan's indexes on `indexer`.
    ///
    /// Stops at the first failing directive; indexes created before it stay.
    /// Returns the number of indexes created.
    pub fn apply<K: Record, M: Mode>(&self, indexer: &BeanIndexer<K, M>) -> IndexResult<usize> {
        let root = introspector::bean_type::<K>();
        let mut walk = Walk {
            plan: self,
            indexer,
            reached: HashSet::new(),
            created: 0,
        };

        walk.bean(&root, "")?;
        for (path, directive) in &self.directives {
            if walk.reached.contains(path) {
                continue;
            }
            let chain = introspector::resolve::<K>(path)?;
            let Some(step) = chain.steps().last() else {
                continue;
            };
            walk.explicit(path, step.descriptor().kind(), directive)?;
        }

        if indexer.config().log_lifecycle {
            observability::emit(
                Event::PlanApplied,
                &[
                    ("type", root.name()),
                    ("created", walk.created.to_string().as_str()),
                    ("directives", self.directives.len().to_string().as_str()),
                ],
            );
        }
        Ok(walk.created)
    }
}

struct Walk<'p, K: Record, M: Mode> {
    plan: &'p IndexPlan,
    indexer: &'p BeanIndexer<K, M>,
    reached: HashSet<String>,
    created: usize,
}

impl<K: Record, M: Mode> Walk<'_, K, M> {
    fn bean(&mut self, bean_type: &BeanType, prefix: &str) -> IndexResult<()> {
        for property in bean_type.properties() {
            let path = if prefix.is_empty() {
                property.name().to_string()
            } else {
                format!("{}.{}", prefix, property.name())
            };

            match self.plan.directives.get(&path) {
                Some(directive) => {
                    self.reached.insert(path.clone());
                    self.explicit(&path, property.kind(), directive)?;
                }
                None => self.implicit(&path, property.kind())?,
            }
        }
        Ok(())
    }

    fn explicit(&mut self, path: &str, kind: &PropertyKind, directive: &IndexDirective) -> IndexResult<()> {
        let created = match directive {
            IndexDirective::Skip => false,
            IndexDirective::Unsorted => self.indexer.add_unsorted_index(path)?,
            IndexDirective::Sorted => self.indexer.add_sorted_index(path)?,
            IndexDirective::SortedWith(cmp) => self.indexer.add_sorted_index_with(path, Arc::clone(cmp))?,
            IndexDirective::Recurse => {
                let nested = kind.nested_type().ok_or_else(|| {
                    IndexError::invalid_directive(path, "recurse needs a nested record attribute")
                })?;
                return self.bean(&nested, path);
            }
        };
        if created {
            self.created += 1;
        }
        Ok(())
    }

    fn implicit(&mut self, path: &str, kind: &PropertyKind) -> IndexResult<()> {
        if kind.nested_type().is_some() {
            return Ok(());
        }

        let created = match self.plan.default {
            DefaultDirective::Skip => false,
            DefaultDirective::Unsorted => self.indexer.add_unsorted_index(path)?,
            DefaultDirective::Sorted if kind.value_kind().is_orderable() => {
                self.indexer.add_sorted_index(path)?
            }
            DefaultDirective::Sorted => self.indexer.add_unsorted_index(path)?,
        };
        if created {
            self.created += 1;
        }
        Ok(())
    }
}

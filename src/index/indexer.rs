//! The indexer: member set, indexes and change wiring
//!
//! # Invariants
//!
//! - A record is a member at most once
//! - Every member is in every bucket its current values map to, and no
//!   non-member is in any bucket
//! - Creating an index produces the buckets that would exist had the index
//!   been present since every member was added
//! - Each member of an observable type has exactly one listener subscribed
//!   by this indexer, removed when it leaves
//!
//! # Caller obligations
//!
//! Buckets follow in-place mutation only through change events, and only for
//! the attribute named in the event. Records of types that do not announce
//! changes, and changes to an intermediate step of a chained path, leave the
//! buckets describing the old state until the record is removed and added
//! again. `remove` re-evaluates the record's current state; when a computed
//! bucket misses the record, the miss is reported as `STALE_BUCKET` and the
//! index is swept so the record leaves whatever bucket still holds it. This
//! also covers a change event still in flight when `remove` runs.
//!
//! Records must announce changes after releasing any lock their attribute
//! readers take.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::buckets::{Comparator, IndexDescriptor, IndexKind};
use super::errors::IndexResult;
use super::mode::{Concurrent, Local, Mode};
use super::plan::IndexPlan;
use super::record::Record;
use super::store::{ChangeOutcome, IndexStore};
use crate::config::IndexerConfig;
use crate::events::{EventBridge, PropertyChangeEvent, PropertyChangeListener};
use crate::observability::{self, Event, IndexerMetrics};
use crate::properties::{introspector, Value};
use crate::search::Filter;

type Subscription = Option<Arc<dyn PropertyChangeListener>>;

/// Mutable state guarded by the core lock.
pub(crate) struct State<K> {
    /// Members and the listener each one carries, if its type is observable
    pub(crate) members: HashMap<K, Subscription>,
    pub(crate) store: IndexStore<K>,
}

/// State shared by an indexer, its searches and its change listeners.
pub(crate) struct Core<K> {
    pub(crate) state: RwLock<State<K>>,
    pub(crate) metrics: IndexerMetrics,
    bridge: Option<EventBridge>,
    config: IndexerConfig,
    type_name: &'static str,
    mode: &'static str,
}

impl<K: Record> Core<K> {
    fn new<M: Mode>(config: IndexerConfig) -> Self {
        let bean_type = introspector::bean_type::<K>();
        let type_name = bean_type.name();
        Self {
            state: RwLock::new(State {
                members: HashMap::with_capacity(config.initial_capacity),
                store: IndexStore::new(),
            }),
            metrics: IndexerMetrics::new(),
            bridge: EventBridge::for_type(bean_type),
            config,
            type_name,
            mode: M::NAME,
        }
    }

    fn unsubscribe(&self, record: &K, subscription: Subscription) {
        if let (Some(bridge), Some(listener)) = (&self.bridge, subscription) {
            bridge.unsubscribe(record, &listener);
        }
    }

    /// Deliver a change event for `record`.
    fn apply_change(&self, record: &K, event: &PropertyChangeEvent) {
        let outcome = {
            let mut state = self.state.write();
            if state.members.contains_key(record) {
                state.store.apply_change(record, event)
            } else {
                ChangeOutcome::NotIndexed
            }
        };

        let event_kind = match outcome {
            ChangeOutcome::Applied => {
                self.metrics.increment_changes_applied();
                Event::ChangeApplied
            }
            ChangeOutcome::NotIndexed => {
                self.metrics.increment_changes_ignored();
                Event::ChangeIgnored
            }
        };

        if self.config.trace_changes {
            let old = display_optional(event.old.as_ref());
            let new = display_optional(event.new.as_ref());
            observability::emit(
                event_kind,
                &[
                    ("type", self.type_name),
                    ("property", event.property.as_str()),
                    ("old", old.as_str()),
                    ("new", new.as_str()),
                ],
            );
        }
    }

    fn lifecycle(&self, event: Event, fields: &[(&str, &str)]) {
        if !self.config.log_lifecycle {
            return;
        }
        let mut all = Vec::with_capacity(fields.len() + 2);
        all.push(("type", self.type_name));
        all.push(("mode", self.mode));
        all.extend_from_slice(fields);
        observability::emit(event, &all);
    }

    fn report_stale(&self, paths: &[String]) {
        for path in paths {
            self.metrics.increment_stale_buckets();
            if self.config.warn_on_stale_buckets {
                observability::emit(Event::StaleBucket, &[("type", self.type_name), ("path", path.as_str())]);
            }
        }
    }
}

fn display_optional(value: Option<&Value>) -> String {
    value.map_or_else(|| String::from("null"), ToString::to_string)
}

/// Listener subscribed on one member record.
struct RecordListener<K> {
    core: Weak<Core<K>>,
    record: K,
}

impl<K: Record> PropertyChangeListener for RecordListener<K> {
    fn property_change(&self, event: &PropertyChangeEvent) {
        if let Some(core) = self.core.upgrade() {
            core.apply_change(&self.record, event);
        }
    }
}

fn subscribe<K: Record>(core: &Arc<Core<K>>, record: &K) -> Subscription {
    let bridge = core.bridge.as_ref()?;
    let listener: Arc<dyn PropertyChangeListener> = Arc::new(RecordListener {
        core: Arc::downgrade(core),
        record: record.clone(),
    });
    bridge
        .subscribe(record, Arc::clone(&listener))
        .then_some(listener)
}

/// In-memory indexer over records of type `K`.
///
/// Indexes are keyed by dotted attribute path. Every operation takes `&self`;
/// the member set and buckets live behind one lock shared with the change
/// listeners subscribed on members. See the module docs for the
/// consistency contract.
///
/// ```ignore
/// let indexer = BeanIndexer::<Item>::new();
/// indexer.add_unsorted_index("name")?;
/// indexer.add_sorted_index("number")?;
/// indexer.add_all(items);
///
/// let hits = indexer
///     .filter()
///     .having("name", "abc")?
///     .and()
///     .having_greater("number", 1, true)?
///     .into_results();
/// ```
pub struct BeanIndexer<K: Record, M: Mode = Local> {
    core: Arc<Core<K>>,
    _mode: PhantomData<M>,
}

impl<K: Record> BeanIndexer<K, Local> {
    /// Create an indexer owned by the current thread
    pub fn new() -> Self {
        Self::with_config(IndexerConfig::default())
    }

    pub fn with_config(config: IndexerConfig) -> Self {
        Self::build(config)
    }

    /// Create an indexer with the indexes an index plan declares
    pub fn from_plan(plan: &IndexPlan) -> IndexResult<Self> {
        let indexer = Self::new();
        plan.apply(&indexer)?;
        Ok(indexer)
    }
}

impl<K: Record> Default for BeanIndexer<K, Local> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Record> BeanIndexer<K, Concurrent> {
    /// Create an indexer that can be shared between threads
    pub fn concurrent() -> Self {
        Self::concurrent_with_config(IndexerConfig::default())
    }

    pub fn concurrent_with_config(config: IndexerConfig) -> Self {
        Self::build(config)
    }

    /// Shared indexer with the indexes an index plan declares
    pub fn concurrent_from_plan(plan: &IndexPlan) -> IndexResult<Self> {
        let indexer = Self::concurrent();
        plan.apply(&indexer)?;
        Ok(indexer)
    }
}

impl<K: Record, M: Mode> BeanIndexer<K, M> {
    fn build(config: IndexerConfig) -> Self {
        Self {
            core: Arc::new(Core::new::<M>(config)),
            _mode: PhantomData,
        }
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Add a record, indexing it under every existing index.
    ///
    /// Returns false if it is already a member.
    pub fn add(&self, record: K) -> bool {
        {
            let mut state = self.core.state.write();
            if state.members.contains_key(&record) {
                return false;
            }

            // Subscribed before values are read: a change racing with this
            // add waits for the lock and then sees the record as a member.
            let subscription = subscribe(&self.core, &record);
            state.store.insert_record(&record);
            state.members.insert(record, subscription);
        }
        self.core.metrics.add_records_added(1);
        true
    }

    /// Add records one by one, returning how many were new.
    pub fn add_all<I: IntoIterator<Item = K>>(&self, records: I) -> usize {
        records
            .into_iter()
            .map(|r| self.add(r))
            .filter(|added| *added)
            .count()
    }

    /// Remove a record from the member set and every bucket.
    ///
    /// Buckets are located by re-evaluating the record's current state.
    /// Returns false if it was not a member.
    pub fn remove(&self, record: &K) -> bool {
        let (member, subscription, stale) = {
            let mut state = self.core.state.write();
            let Some((member, subscription)) = state.members.remove_entry(record) else {
                return false;
            };
            let stale = state.store.remove_record(&member);
            (member, subscription, stale)
        };

        self.core.unsubscribe(&member, subscription);
        self.core.report_stale(&stale);
        self.core.metrics.add_records_removed(1);
        true
    }

    /// Remove records one by one, returning how many were members.
    pub fn remove_all<I>(&self, records: I) -> usize
    where
        I: IntoIterator,
        I::Item: Borrow<K>,
    {
        records
            .into_iter()
            .filter(|r| self.remove(Borrow::<K>::borrow(r)))
            .count()
    }

    /// Remove every member for which `keep` returns false.
    ///
    /// `keep` runs on a snapshot, outside the lock, so it may call back into
    /// the indexer.
    pub fn retain<F: FnMut(&K) -> bool>(&self, mut keep: F) -> usize {
        self.elements()
            .into_iter()
            .filter(|r| !keep(r))
            .filter(|r| self.remove(r))
            .count()
    }

    /// Remove every member. Indexes stay, empty.
    pub fn clear(&self) {
        let drained: Vec<(K, Subscription)> = {
            let mut state = self.core.state.write();
            state.store.clear_buckets();
            state.members.drain().collect()
        };

        let count = drained.len();
        for (record, subscription) in drained {
            self.core.unsubscribe(&record, subscription);
        }
        self.core.metrics.add_records_removed(count as u64);
        self.core
            .lifecycle(Event::RecordsCleared, &[("records", count.to_string().as_str())]);
    }

    pub fn contains(&self, record: &K) -> bool {
        self.core.state.read().members.contains_key(record)
    }

    pub fn len(&self) -> usize {
        self.core.state.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the member set, in no particular order
    pub fn elements(&self) -> Vec<K> {
        self.core.state.read().members.keys().cloned().collect()
    }

    // ========================================================================
    // Index management
    // ========================================================================

    /// Index `path` for equality and membership lookups.
    ///
    /// A new index is filled from the current members. Returns false if an
    /// unsorted index on `path` already exists; fails with
    /// `IndexKindConflict` if a sorted one does.
    pub fn add_unsorted_index(&self, path: &str) -> IndexResult<bool> {
        let (created, records) = {
            let mut state = self.core.state.write();
            let State { members, store } = &mut *state;
            (store.add_unsorted(path, members.keys())?, members.len())
        };
        if created {
            self.index_created(path, IndexKind::Unsorted, records);
        }
        Ok(created)
    }

    /// Index `path` for equality, membership and range lookups under the
    /// natural value order.
    ///
    /// Fails with `NotOrderable` when the attribute holds nested records.
    pub fn add_sorted_index(&self, path: &str) -> IndexResult<bool> {
        self.add_sorted(path, None)
    }

    /// Sorted index ordered by `compare`.
    ///
    /// Values that compare equal share one bucket.
    pub fn add_sorted_index_by<F>(&self, path: &str, compare: F) -> IndexResult<bool>
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.add_sorted(path, Some(Arc::new(compare)))
    }

    /// Sorted index ordered by a shared comparator
    pub fn add_sorted_index_with(&self, path: &str, comparator: Comparator) -> IndexResult<bool> {
        self.add_sorted(path, Some(comparator))
    }

    fn add_sorted(&self, path: &str, comparator: Option<Comparator>) -> IndexResult<bool> {
        let (created, records) = {
            let mut state = self.core.state.write();
            let State { members, store } = &mut *state;
            (store.add_sorted(path, comparator, members.keys())?, members.len())
        };
        if created {
            self.index_created(path, IndexKind::Sorted, records);
        }
        Ok(created)
    }

    fn index_created(&self, path: &str, kind: IndexKind, records: usize) {
        self.core.metrics.increment_indexes_created();
        self.core.lifecycle(
            Event::IndexCreated,
            &[
                ("path", path),
                ("kind", kind.as_str()),
                ("records", records.to_string().as_str()),
            ],
        );
    }

    /// Drop the index on `path`. Returns whether one existed.
    pub fn remove_index(&self, path: &str) -> bool {
        let removed = self.core.state.write().store.remove_index(path);
        if removed {
            self.core.metrics.increment_indexes_removed();
            self.core.lifecycle(Event::IndexRemoved, &[("path", path)]);
        }
        removed
    }

    pub fn has_index(&self, path: &str) -> bool {
        self.core.state.read().store.contains(path)
    }

    /// Indexed paths in lexical order
    pub fn index_paths(&self) -> Vec<String> {
        self.core.state.read().store.paths()
    }

    pub fn index_count(&self) -> usize {
        self.core.state.read().store.len()
    }

    pub fn descriptor(&self, path: &str) -> Option<IndexDescriptor> {
        self.core.state.read().store.descriptor(path).cloned()
    }

    /// Descriptors of every index, in path order
    pub fn descriptors(&self) -> Vec<IndexDescriptor> {
        self.core.state.read().store.descriptors()
    }

    /// Distinct values currently indexed under `path`.
    ///
    /// Sorted indexes list values in index order; unsorted ones in natural
    /// value order.
    pub fn values_of(&self, path: &str) -> IndexResult<Vec<Value>> {
        self.core.state.read().store.values_of(path)
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Start a search. The first predicate seeds the result.
    pub fn filter(&self) -> Filter<'_, K> {
        self.core.metrics.increment_searches_started();
        Filter::new(&self.core)
    }

    // ========================================================================
    // Observability
    // ========================================================================

    pub fn metrics(&self) -> &IndexerMetrics {
        &self.core.metrics
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.core.config
    }
}

impl<K: Record, M: Mode> Drop for BeanIndexer<K, M> {
    fn drop(&mut self) {
        // Listeners hold their record; detaching breaks the cycle through
        // each record's change registry.
        let drained: Vec<(K, Subscription)> = self.core.state.write().members.drain().collect();
        for (record, subscription) in drained {
            self.core.unsubscribe(&record, subscription);
        }
    }
}

impl<K: Record, M: Mode> fmt::Debug for BeanIndexer<K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.read();
        f.debug_struct("BeanIndexer")
            .field("type", &self.core.type_name)
            .field("mode", &M::NAME)
            .field("members", &state.members.len())
            .field("indexes", &state.store.paths())
            .finish()
    }
}

//! Per-path indexes over the member set
//!
//! # Invariants
//!
//! - At most one index per attribute path
//! - A record is in the bucket for value V under path P iff it is a member
//!   and evaluating P against it yields V (modulo the drift documented on
//!   [`BeanIndexer`](super::BeanIndexer))
//! - No bucket is ever empty

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::buckets::{Buckets, Comparator, Direction, IndexDescriptor, IndexKind, KeyOrder};
use super::errors::{IndexError, IndexResult};
use super::record::Record;
use crate::events::PropertyChangeEvent;
use crate::properties::{introspector, PropertyChain, Value};

/// One maintained index.
pub(crate) struct IndexEntry<K> {
    descriptor: IndexDescriptor,
    chain: Arc<PropertyChain>,
    buckets: Buckets<K>,
}

impl<K: Record> IndexEntry<K> {
    fn new(chain: Arc<PropertyChain>, buckets: Buckets<K>) -> Self {
        let descriptor = IndexDescriptor {
            path: chain.path().to_string(),
            kind: buckets.kind(),
            value_kind: chain.terminal_kind(),
            flattening: chain.is_flattening(),
            custom_order: buckets.order().is_some_and(|o| !o.is_natural()),
        };
        Self {
            descriptor,
            chain,
            buckets,
        }
    }

    pub(crate) fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    fn path(&self) -> &str {
        &self.descriptor.path
    }

    fn index(&mut self, record: &K) {
        for value in self.chain.values(record) {
            self.buckets.insert(value, record.clone());
        }
    }

    /// Remove `record` from the buckets its current values map to, returning
    /// how many of them did not hold it.
    ///
    /// On a miss the record was indexed under values it no longer has, so
    /// every bucket is swept for it.
    fn unindex(&mut self, record: &K) -> usize {
        let values = self.chain.collect_values(record);
        let missed = self.buckets.remove_all(values, record);
        if missed > 0 {
            self.buckets.sweep(record);
        }
        missed
    }

    /// Records whose value equals `value`
    pub(crate) fn bucket(&self, value: &Value) -> Option<&HashSet<K>> {
        self.buckets.get(value)
    }

    /// Buckets for each of `values` that has one
    pub(crate) fn buckets_for<'v>(&self, values: impl IntoIterator<Item = &'v Value>) -> Vec<&HashSet<K>> {
        values.into_iter().filter_map(|v| self.buckets.get(v)).collect()
    }

    /// Buckets on one side of `bound`.
    ///
    /// Under natural ordering the bound must have the kind of the stored
    /// keys; a mismatch is only detected here, never when records are added.
    pub(crate) fn range(&self, bound: &Value, direction: Direction, inclusive: bool) -> IndexResult<Vec<&HashSet<K>>> {
        let Some(order) = self.buckets.order() else {
            return Err(IndexError::NotSortedIndex {
                path: self.path().to_string(),
            });
        };

        if order.is_natural() {
            if let Some((first, last)) = self.buckets.extreme_kinds() {
                let bound_kind = bound.kind();
                let stored = if first != bound_kind { first } else { last };
                if stored != bound_kind {
                    return Err(IndexError::IncomparableValues {
                        path: self.path().to_string(),
                        bound: bound_kind,
                        stored,
                    });
                }
            }
        }

        Ok(self.buckets.range(bound, direction, inclusive))
    }
}

/// Outcome of delivering a change event to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeOutcome {
    Applied,
    NotIndexed,
}

/// All indexes of one indexer, keyed by path.
pub(crate) struct IndexStore<K> {
    indexes: BTreeMap<String, IndexEntry<K>>,
}

impl<K: Record> IndexStore<K> {
    pub(crate) fn new() -> Self {
        Self {
            indexes: BTreeMap::new(),
        }
    }

    pub(crate) fn contains(&self, path: &str) -> bool {
        self.indexes.contains_key(path)
    }

    pub(crate) fn entry(&self, path: &str) -> IndexResult<&IndexEntry<K>> {
        self.indexes
            .get(path)
            .ok_or_else(|| IndexError::no_such_index(path))
    }

    pub(crate) fn descriptor(&self, path: &str) -> Option<&IndexDescriptor> {
        self.indexes.get(path).map(IndexEntry::descriptor)
    }

    /// Descriptors in path order
    pub(crate) fn descriptors(&self) -> Vec<IndexDescriptor> {
        self.indexes.values().map(|e| e.descriptor.clone()).collect()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Create an unsorted index on `path` and backfill it from `members`.
    ///
    /// Returns false if an unsorted index already exists.
    pub(crate) fn add_unsorted<'m>(&mut self, path: &str, members: impl Iterator<Item = &'m K>) -> IndexResult<bool>
    where
        K: 'm,
    {
        if self.check_existing(path, IndexKind::Unsorted)? {
            return Ok(false);
        }

        let chain = introspector::resolve::<K>(path)?;
        self.install(IndexEntry::new(chain, Buckets::unsorted()), members);
        Ok(true)
    }

    /// Create a sorted index on `path` and backfill it from `members`.
    ///
    /// Without a comparator the terminal attribute must be naturally
    /// orderable. Returns false if a sorted index already exists; its
    /// ordering is kept.
    pub(crate) fn add_sorted<'m>(
        &mut self,
        path: &str,
        comparator: Option<Comparator>,
        members: impl Iterator<Item = &'m K>,
    ) -> IndexResult<bool>
    where
        K: 'm,
    {
        if self.check_existing(path, IndexKind::Sorted)? {
            return Ok(false);
        }

        let chain = introspector::resolve::<K>(path)?;
        let order = match comparator {
            Some(cmp) => KeyOrder::Custom(cmp),
            None => {
                let kind = chain.terminal_kind();
                if !kind.is_orderable() {
                    return Err(IndexError::NotOrderable {
                        path: path.to_string(),
                        kind,
                    });
                }
                KeyOrder::Natural
            }
        };

        self.install(IndexEntry::new(chain, Buckets::sorted(order)), members);
        Ok(true)
    }

    /// True if an index of `kind` exists, a conflict error if one of the
    /// other kind does.
    fn check_existing(&self, path: &str, kind: IndexKind) -> IndexResult<bool> {
        match self.indexes.get(path) {
            None => Ok(false),
            Some(entry) if entry.descriptor.kind == kind => Ok(true),
            Some(entry) => Err(IndexError::IndexKindConflict {
                path: path.to_string(),
                existing: entry.descriptor.kind,
            }),
        }
    }

    fn install<'m>(&mut self, mut entry: IndexEntry<K>, members: impl Iterator<Item = &'m K>)
    where
        K: 'm,
    {
        for record in members {
            entry.index(record);
        }
        self.indexes.insert(entry.path().to_string(), entry);
    }

    /// Drop the index on `path`, returning whether one existed
    pub(crate) fn remove_index(&mut self, path: &str) -> bool {
        self.indexes.remove(path).is_some()
    }

    /// Distinct values currently present under `path`
    pub(crate) fn values_of(&self, path: &str) -> IndexResult<Vec<Value>> {
        Ok(self.entry(path)?.buckets.keys())
    }

    /// Put a new member into every index
    pub(crate) fn insert_record(&mut self, record: &K) {
        for entry in self.indexes.values_mut() {
            entry.index(record);
        }
    }

    /// Take a leaving member out of every index.
    ///
    /// Returns the paths where a bucket computed from the record's current
    /// state did not hold it.
    pub(crate) fn remove_record(&mut self, record: &K) -> Vec<String> {
        self.indexes
            .values_mut()
            .filter_map(|entry| (entry.unindex(record) > 0).then(|| entry.path().to_string()))
            .collect()
    }

    /// Move `record` between the buckets named by a change event.
    ///
    /// Only an index whose path is exactly the changed attribute is touched.
    pub(crate) fn apply_change(&mut self, record: &K, event: &PropertyChangeEvent) -> ChangeOutcome {
        let Some(entry) = self.indexes.get_mut(&event.property) else {
            return ChangeOutcome::NotIndexed;
        };

        if let Some(old) = &event.old {
            entry.buckets.remove(old.clone(), record);
        }
        if let Some(new) = &event.new {
            entry.buckets.insert(new.clone(), record.clone());
        }
        ChangeOutcome::Applied
    }

    /// Empty every bucket map, keeping the indexes
    pub(crate) fn clear_buckets(&mut self) {
        for entry in self.indexes.values_mut() {
            entry.buckets.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{BeanType, Introspect, PropertyError, ValueKind};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Tag {
        label: &'static str,
        weight: i64,
        aliases: Vec<&'static str>,
    }

    impl Introspect for Tag {
        fn describe() -> BeanType {
            BeanType::builder::<Tag>("Tag")
                .value("label", ValueKind::Text, |t| t.label)
                .value("weight", ValueKind::Int, |t| t.weight)
                .values("aliases", ValueKind::Text, |t| t.aliases.clone())
                .build()
        }
    }

    fn tag(label: &'static str, weight: i64, aliases: &[&'static str]) -> Tag {
        Tag {
            label,
            weight,
            aliases: aliases.to_vec(),
        }
    }

    fn members() -> Vec<Tag> {
        vec![tag("red", 1, &["crimson"]), tag("blue", 2, &["navy", "azure"]), tag("red", 3, &[])]
    }

    #[test]
    fn test_backfill_matches_incremental() {
        let tags = members();

        let mut backfilled = IndexStore::new();
        backfilled.add_unsorted("label", tags.iter()).unwrap();

        let mut incremental = IndexStore::new();
        incremental.add_unsorted("label", std::iter::empty()).unwrap();
        for t in &tags {
            incremental.insert_record(t);
        }

        assert_eq!(backfilled.values_of("label").unwrap(), incremental.values_of("label").unwrap());
        let red = Value::text("red");
        assert_eq!(
            backfilled.entry("label").unwrap().bucket(&red),
            incremental.entry("label").unwrap().bucket(&red)
        );
    }

    #[test]
    fn test_add_same_kind_is_noop() {
        let tags = members();
        let mut store = IndexStore::new();
        assert!(store.add_unsorted("label", tags.iter()).unwrap());
        assert!(!store.add_unsorted("label", tags.iter()).unwrap());
        assert!(store.add_sorted("weight", None, tags.iter()).unwrap());
        assert!(!store.add_sorted("weight", None, tags.iter()).unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_kind_conflict_leaves_index() {
        let tags = members();
        let mut store = IndexStore::new();
        store.add_unsorted("weight", tags.iter()).unwrap();

        let err = store.add_sorted("weight", None, tags.iter()).unwrap_err();
        assert_eq!(
            err,
            IndexError::IndexKindConflict {
                path: "weight".into(),
                existing: IndexKind::Unsorted
            }
        );
        assert_eq!(store.descriptor("weight").unwrap().kind, IndexKind::Unsorted);
        assert_eq!(store.values_of("weight").unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_path() {
        let mut store: IndexStore<Tag> = IndexStore::new();
        let err = store.add_unsorted("colour", std::iter::empty()).unwrap_err();
        assert_eq!(err, IndexError::Property(PropertyError::unknown("Tag", "colour")));
        assert!(!store.contains("colour"));
    }

    #[test]
    fn test_flattened_values() {
        let tags = members();
        let mut store = IndexStore::new();
        store.add_unsorted("aliases", tags.iter()).unwrap();

        assert_eq!(
            store.values_of("aliases").unwrap(),
            vec![Value::text("azure"), Value::text("crimson"), Value::text("navy")]
        );
        assert!(store.descriptor("aliases").unwrap().flattening);
    }

    #[test]
    fn test_remove_record_prunes() {
        let tags = members();
        let mut store = IndexStore::new();
        store.add_unsorted("label", tags.iter()).unwrap();

        assert!(store.remove_record(&tags[1]).is_empty());
        assert_eq!(store.values_of("label").unwrap(), vec![Value::text("red")]);
    }

    #[test]
    fn test_remove_record_reports_stale() {
        let tags = members();
        let mut store = IndexStore::new();
        store.add_unsorted("label", tags.iter()).unwrap();

        let mut drifted = tags[1].clone();
        drifted.label = "green";
        assert_eq!(store.remove_record(&drifted), vec!["label".to_string()]);
    }

    #[test]
    fn test_apply_change() {
        let tags = members();
        let mut store = IndexStore::new();
        store.add_sorted("weight", None, tags.iter()).unwrap();

        let event = PropertyChangeEvent {
            property: "weight".into(),
            old: Some(Value::Int(2)),
            new: Some(Value::Int(5)),
        };
        assert_eq!(store.apply_change(&tags[1], &event), ChangeOutcome::Applied);
        assert_eq!(
            store.values_of("weight").unwrap(),
            vec![Value::Int(1), Value::Int(3), Value::Int(5)]
        );

        let other = PropertyChangeEvent {
            property: "label".into(),
            old: None,
            new: Some(Value::text("x")),
        };
        assert_eq!(store.apply_change(&tags[1], &other), ChangeOutcome::NotIndexed);
    }

    #[test]
    fn test_range_checks() {
        let tags = members();
        let mut store = IndexStore::new();
        store.add_unsorted("label", tags.iter()).unwrap();
        store.add_sorted("weight", None, tags.iter()).unwrap();

        let err = store
            .entry("label")
            .unwrap()
            .range(&Value::text("a"), Direction::Greater, true)
            .unwrap_err();
        assert_eq!(err.code(), "BEAN_NOT_SORTED_INDEX");

        let err = store
            .entry("weight")
            .unwrap()
            .range(&Value::text("a"), Direction::Greater, true)
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::IncomparableValues {
                path: "weight".into(),
                bound: ValueKind::Text,
                stored: ValueKind::Int
            }
        );

        let hits = store
            .entry("weight")
            .unwrap()
            .range(&Value::Int(2), Direction::Greater, true)
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_clear_buckets_keeps_indexes() {
        let tags = members();
        let mut store = IndexStore::new();
        store.add_unsorted("label", tags.iter()).unwrap();
        store.clear_buckets();

        assert!(store.contains("label"));
        assert!(store.values_of("label").unwrap().is_empty());
        assert_eq!(store.paths(), vec!["label".to_string()]);
    }
}

//! Bucket maps: observed value -> set of records
//!
//! Unsorted indexes hash their keys. Sorted indexes keep keys in a BTreeMap
//! under either the natural `Value` order or a caller-supplied comparator.
//! A bucket that loses its last record is removed from the map.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::ops::Bound;
use std::sync::Arc;

use serde::Serialize;

use crate::properties::{Value, ValueKind};

/// Total ordering over values used by a sorted index.
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Key ordering of a sorted index
#[derive(Clone)]
pub enum KeyOrder {
    /// `Value`'s own `Ord`
    Natural,
    /// Caller-supplied; keys that compare equal share one bucket
    Custom(Comparator),
}

impl KeyOrder {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self {
            KeyOrder::Natural => a.cmp(b),
            KeyOrder::Custom(cmp) => cmp(a, b),
        }
    }

    pub fn is_natural(&self) -> bool {
        matches!(self, KeyOrder::Natural)
    }
}

impl fmt::Debug for KeyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOrder::Natural => f.write_str("Natural"),
            KeyOrder::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A value positioned by a key order.
#[derive(Clone)]
pub(crate) struct SortKey {
    value: Value,
    order: KeyOrder,
}

impl SortKey {
    pub(crate) fn new(value: Value, order: &KeyOrder) -> Self {
        Self {
            value,
            order: order.clone(),
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order.compare(&self.value, &other.value)
    }
}

/// Kind of a maintained index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Equality and membership lookups
    Unsorted,
    /// Equality, membership and range lookups
    Sorted,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Unsorted => "unsorted",
            IndexKind::Sorted => "sorted",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one maintained index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    /// Indexed attribute path
    pub path: String,
    /// Unsorted or sorted
    pub kind: IndexKind,
    /// Declared kind of the terminal attribute
    pub value_kind: ValueKind,
    /// Whether the path flattens a collection
    pub flattening: bool,
    /// Whether a sorted index uses a caller-supplied comparator
    pub custom_order: bool,
}

/// Direction of a range lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Greater,
    Lower,
}

/// Bucket map of one index.
pub(crate) enum Buckets<K> {
    Unsorted(HashMap<Value, HashSet<K>>),
    Sorted {
        order: KeyOrder,
        map: BTreeMap<SortKey, HashSet<K>>,
    },
}

impl<K: Eq + Hash + Clone> Buckets<K> {
    pub(crate) fn unsorted() -> Self {
        Buckets::Unsorted(HashMap::new())
    }

    pub(crate) fn sorted(order: KeyOrder) -> Self {
        Buckets::Sorted {
            order,
            map: BTreeMap::new(),
        }
    }

    pub(crate) fn kind(&self) -> IndexKind {
        match self {
            Buckets::Unsorted(_) => IndexKind::Unsorted,
            Buckets::Sorted { .. } => IndexKind::Sorted,
        }
    }

    pub(crate) fn order(&self) -> Option<&KeyOrder> {
        match self {
            Buckets::Unsorted(_) => None,
            Buckets::Sorted { order, .. } => Some(order),
        }
    }

    /// Add a record to the bucket for `value`.
    pub(crate) fn insert(&mut self, value: Value, record: K) {
        match self {
            Buckets::Unsorted(map) => {
                map.entry(value).or_default().insert(record);
            }
            Buckets::Sorted { order, map } => {
                map.entry(SortKey::new(value, order))
                    .or_default()
                    .insert(record);
            }
        }
    }

    /// Remove a record from the bucket for `value`, pruning the bucket if it
    /// becomes empty. Returns whether the record was there.
    pub(crate) fn remove(&mut self, value: Value, record: &K) -> bool {
        match self {
            Buckets::Unsorted(map) => prune(map, value, record),
            Buckets::Sorted { order, map } => prune(map, SortKey::new(value, order), record),
        }
    }

    /// Remove a record from every bucket one of `values` maps to.
    ///
    /// Values mapping to the same bucket are visited once. Returns the
    /// number of buckets that did not contain the record.
    pub(crate) fn remove_all(&mut self, values: impl IntoIterator<Item = Value>, record: &K) -> usize {
        match self {
            Buckets::Unsorted(map) => {
                let distinct: HashSet<Value> = values.into_iter().collect();
                distinct
                    .into_iter()
                    .filter(|v| !prune(map, v.clone(), record))
                    .count()
            }
            Buckets::Sorted { order, map } => {
                let order = &*order;
                let distinct: BTreeSet<SortKey> =
                    values.into_iter().map(|v| SortKey::new(v, order)).collect();
                distinct
                    .into_iter()
                    .filter(|k| !prune(map, k.clone(), record))
                    .count()
            }
        }
    }

    /// Records in the bucket for `value`
    pub(crate) fn get(&self, value: &Value) -> Option<&HashSet<K>> {
        match self {
            Buckets::Unsorted(map) => map.get(value),
            Buckets::Sorted { order, map } => map.get(&SortKey::new(value.clone(), order)),
        }
    }

    /// Buckets strictly beyond `bound` in `direction`, or including it when
    /// `inclusive`. Empty for unsorted maps.
    pub(crate) fn range(&self, bound: &Value, direction: Direction, inclusive: bool) -> Vec<&HashSet<K>> {
        let Buckets::Sorted { order, map } = self else {
            return Vec::new();
        };

        let probe = SortKey::new(bound.clone(), order);
        let edge = if inclusive {
            Bound::Included(&probe)
        } else {
            Bound::Excluded(&probe)
        };
        let range: (Bound<&SortKey>, Bound<&SortKey>) = match direction {
            Direction::Greater => (edge, Bound::Unbounded),
            Direction::Lower => (Bound::Unbounded, edge),
        };
        map.range(range).map(|(_, records)| records).collect()
    }

    /// Kinds of the smallest and largest stored keys of a sorted map
    pub(crate) fn extreme_kinds(&self) -> Option<(ValueKind, ValueKind)> {
        match self {
            Buckets::Unsorted(_) => None,
            Buckets::Sorted { map, .. } => {
                let first = map.keys().next()?;
                let last = map.keys().next_back()?;
                Some((first.value.kind(), last.value.kind()))
            }
        }
    }

    /// Distinct keys; key order for sorted maps, natural order otherwise
    pub(crate) fn keys(&self) -> Vec<Value> {
        match self {
            Buckets::Unsorted(map) => {
                let mut keys: Vec<Value> = map.keys().cloned().collect();
                keys.sort();
                keys
            }
            Buckets::Sorted { map, .. } => map.keys().map(|k| k.value.clone()).collect(),
        }
    }

    /// Remove a record from every bucket holding it, pruning buckets it
    /// leaves empty. Returns how many buckets held it.
    pub(crate) fn sweep(&mut self, record: &K) -> usize {
        let mut found = 0;
        let mut take = |records: &mut HashSet<K>| {
            if records.remove(record) {
                found += 1;
            }
            !records.is_empty()
        };
        match self {
            Buckets::Unsorted(map) => map.retain(|_, records| take(records)),
            Buckets::Sorted { map, .. } => map.retain(|_, records| take(records)),
        }
        found
    }

    pub(crate) fn clear(&mut self) {
        match self {
            Buckets::Unsorted(map) => map.clear(),
            Buckets::Sorted { map, .. } => map.clear(),
        }
    }
}

trait BucketMap<Q, K> {
    fn bucket_mut(&mut self, key: &Q) -> Option<&mut HashSet<K>>;
    fn drop_bucket(&mut self, key: &Q);
}

impl<K> BucketMap<Value, K> for HashMap<Value, HashSet<K>> {
    fn bucket_mut(&mut self, key: &Value) -> Option<&mut HashSet<K>> {
        self.get_mut(key)
    }

    fn drop_bucket(&mut self, key: &Value) {
        self.remove(key);
    }
}

impl<K> BucketMap<SortKey, K> for BTreeMap<SortKey, HashSet<K>> {
    fn bucket_mut(&mut self, key: &SortKey) -> Option<&mut HashSet<K>> {
        self.get_mut(key)
    }

    fn drop_bucket(&mut self, key: &SortKey) {
        self.remove(key);
    }
}

fn prune<Q, K: Eq + Hash>(map: &mut impl BucketMap<Q, K>, key: Q, record: &K) -> bool {
    let Some(records) = map.bucket_mut(&key) else {
        return false;
    };
    let removed = records.remove(record);
    if records.is_empty() {
        map.drop_bucket(&key);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(set: Option<&HashSet<u32>>) -> Vec<u32> {
        let mut v: Vec<u32> = set.map(|s| s.iter().copied().collect()).unwrap_or_default();
        v.sort();
        v
    }

    #[test]
    fn test_insert_and_get() {
        let mut buckets = Buckets::unsorted();
        buckets.insert(Value::text("abc"), 1);
        buckets.insert(Value::text("abc"), 2);
        buckets.insert(Value::text("xyz"), 3);

        assert_eq!(records(buckets.get(&Value::text("abc"))), vec![1, 2]);
        assert_eq!(records(buckets.get(&Value::text("xyz"))), vec![3]);
        assert!(buckets.get(&Value::text("nope")).is_none());
        assert_eq!(buckets.keys().len(), 2);
    }

    #[test]
    fn test_empty_buckets_pruned() {
        let mut buckets = Buckets::sorted(KeyOrder::Natural);
        buckets.insert(Value::Int(1), 10);
        buckets.insert(Value::Int(2), 20);

        assert!(buckets.remove(Value::Int(1), &10));
        assert_eq!(buckets.keys(), vec![Value::Int(2)]);
        assert!(!buckets.remove(Value::Int(1), &10));
    }

    #[test]
    fn test_remove_all_counts_missing() {
        let mut buckets = Buckets::unsorted();
        buckets.insert(Value::Int(1), 7);
        buckets.insert(Value::Int(2), 7);

        let missing = buckets.remove_all(vec![Value::Int(1), Value::Int(1), Value::Int(3)], &7);
        assert_eq!(missing, 1);
        assert_eq!(buckets.keys(), vec![Value::Int(2)]);
    }

    #[test]
    fn test_sweep_finds_record_anywhere() {
        let mut buckets = Buckets::sorted(KeyOrder::Natural);
        buckets.insert(Value::Int(1), 7);
        buckets.insert(Value::Int(1), 8);
        buckets.insert(Value::Int(4), 7);

        assert_eq!(buckets.sweep(&7), 2);
        assert_eq!(buckets.keys(), vec![Value::Int(1)]);
        assert_eq!(records(buckets.get(&Value::Int(1))), vec![8]);
        assert_eq!(buckets.sweep(&7), 0);
    }

    #[test]
    fn test_range_inclusive_and_exclusive() {
        let mut buckets = Buckets::sorted(KeyOrder::Natural);
        for (n, id) in [(1, 1), (2, 2), (8, 3)] {
            buckets.insert(Value::Int(n), id);
        }

        let collect = |sets: Vec<&HashSet<u32>>| {
            let mut ids: Vec<u32> = sets.into_iter().flatten().copied().collect();
            ids.sort();
            ids
        };

        assert_eq!(collect(buckets.range(&Value::Int(2), Direction::Greater, true)), vec![2, 3]);
        assert_eq!(collect(buckets.range(&Value::Int(2), Direction::Greater, false)), vec![3]);
        assert_eq!(collect(buckets.range(&Value::Int(8), Direction::Lower, false)), vec![1, 2]);
        assert_eq!(collect(buckets.range(&Value::Int(0), Direction::Lower, true)), Vec::<u32>::new());
    }

    #[test]
    fn test_custom_order_merges_equal_keys() {
        let by_length: Comparator = Arc::new(|a: &Value, b: &Value| {
            let len = |v: &Value| v.as_text().map_or(0, str::len);
            len(a).cmp(&len(b))
        });
        let mut buckets = Buckets::sorted(KeyOrder::Custom(by_length));
        buckets.insert(Value::text("ab"), 1);
        buckets.insert(Value::text("cd"), 2);
        buckets.insert(Value::text("efg"), 3);

        assert_eq!(buckets.keys().len(), 2);
        assert_eq!(records(buckets.get(&Value::text("zz"))), vec![1, 2]);
        assert_eq!(buckets.remove_all(vec![Value::text("ab"), Value::text("cd")], &1), 0);
    }

    #[test]
    fn test_keys_deterministic() {
        let mut buckets = Buckets::unsorted();
        for n in [5, 3, 9, 1] {
            buckets.insert(Value::Int(n), n as u32);
        }
        assert_eq!(
            buckets.keys(),
            vec![Value::Int(1), Value::Int(3), Value::Int(5), Value::Int(9)]
        );
    }

    #[test]
    fn test_extreme_kinds() {
        let mut buckets = Buckets::sorted(KeyOrder::Natural);
        assert_eq!(buckets.extreme_kinds(), None);
        buckets.insert(Value::Int(3), 1);
        buckets.insert(Value::text("x"), 2);
        assert_eq!(buckets.extreme_kinds(), Some((ValueKind::Int, ValueKind::Text)));
        assert_eq!(Buckets::<u32>::unsorted().extreme_kinds(), None);
    }
}

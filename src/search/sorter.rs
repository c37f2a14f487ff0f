//! Result ordering
//!
//! Results are unordered sets; these helpers materialize them into ordered
//! collections on demand. Nothing is cached.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use crate::properties::{PropertyChain, Value};

/// Sort direction for attribute-based ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Orders result sets
pub struct ResultSorter;

impl ResultSorter {
    /// Natural order of the record type
    pub fn natural<K: Ord + Clone>(records: &HashSet<K>) -> BTreeSet<K> {
        records.iter().cloned().collect()
    }

    /// Order given by `compare`. Records comparing equal keep an
    /// unspecified relative order.
    pub fn by<K, F>(records: &HashSet<K>, mut compare: F) -> Vec<K>
    where
        K: Clone,
        F: FnMut(&K, &K) -> Ordering,
    {
        let mut sorted: Vec<K> = records.iter().cloned().collect();
        sorted.sort_by(|a, b| compare(a, b));
        sorted
    }

    /// Order by the smallest value `chain` yields for each record.
    ///
    /// Records with no value sort first in ascending order.
    pub fn by_path<K>(records: &HashSet<K>, chain: &PropertyChain, direction: SortDirection) -> Vec<K>
    where
        K: Clone + 'static,
    {
        let mut keyed: Vec<(Option<Value>, K)> = records
            .iter()
            .map(|r| (chain.values(r).min(), r.clone()))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = Self::compare_values(a.as_ref(), b.as_ref());
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        keyed.into_iter().map(|(_, r)| r).collect()
    }

    /// Absent < present; present values in natural order.
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

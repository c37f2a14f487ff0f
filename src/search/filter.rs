//! Fluent search over an indexer's buckets
//!
//! A [`Search`] holds an accumulated result set. Each predicate produces a
//! partial set from one index and folds it into the accumulator with the
//! combinator chosen just before it: `and()` keeps records present in both,
//! `or()` takes the union. The first predicate after `filter()` seeds the
//! accumulator.
//!
//! Partial sets are never materialized. Bucket references are read under the
//! indexer's read lock; complements (`not_having`, `not_in`) are tested per
//! member.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use super::errors::{SearchError, SearchResult};
use super::sorter::{ResultSorter, SortDirection};
use crate::index::{Core, Direction, IndexEntry, IndexResult, Record};
use crate::properties::{introspector, Value};

/// How the next partial set joins the accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

/// Which buckets one predicate selects
enum Selection {
    Equal(Value),
    AnyOf(Vec<Value>),
    Range {
        bound: Value,
        direction: Direction,
        inclusive: bool,
    },
}

impl Selection {
    fn buckets<'s, K: Record>(&self, entry: &'s IndexEntry<K>) -> IndexResult<Vec<&'s HashSet<K>>> {
        match self {
            Selection::Equal(value) => Ok(entry.bucket(value).into_iter().collect()),
            Selection::AnyOf(values) => Ok(entry.buckets_for(values)),
            Selection::Range {
                bound,
                direction,
                inclusive,
            } => entry.range(bound, *direction, *inclusive),
        }
    }
}

/// A search waiting for its next predicate.
///
/// Every predicate fails with `NoSuchIndex` if the path is not indexed;
/// range predicates fail with `NotSortedIndex` on an unsorted index.
pub struct Filter<'a, K: Record> {
    search: Search<'a, K>,
}

impl<'a, K: Record> Filter<'a, K> {
    pub(crate) fn new(core: &'a Core<K>) -> Self {
        Self {
            search: Search {
                core,
                results: HashSet::new(),
                combinator: Combinator::Or,
            },
        }
    }

    /// Combinator the next predicate will use
    pub fn combinator(&self) -> Combinator {
        self.search.combinator
    }

    /// Records whose `path` yields `value`
    pub fn having(self, path: &str, value: impl Into<Value>) -> IndexResult<Search<'a, K>> {
        self.search.apply(path, Selection::Equal(value.into()), false)
    }

    /// Members whose `path` does not yield `value`
    pub fn not_having(self, path: &str, value: impl Into<Value>) -> IndexResult<Search<'a, K>> {
        self.search.apply(path, Selection::Equal(value.into()), true)
    }

    /// Records whose `path` yields any of `values`
    pub fn is_in<I, V>(self, path: &str, values: I) -> IndexResult<Search<'a, K>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.search.apply(path, Selection::AnyOf(values), false)
    }

    /// Members whose `path` yields none of `values`
    pub fn not_in<I, V>(self, path: &str, values: I) -> IndexResult<Search<'a, K>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.search.apply(path, Selection::AnyOf(values), true)
    }

    /// Records with a key above `value` (or equal, when `inclusive`) in the
    /// sorted index's order
    pub fn having_greater(self, path: &str, value: impl Into<Value>, inclusive: bool) -> IndexResult<Search<'a, K>> {
        let selection = Selection::Range {
            bound: value.into(),
            direction: Direction::Greater,
            inclusive,
        };
        self.search.apply(path, selection, false)
    }

    /// Records with a key below `value` (or equal, when `inclusive`)
    pub fn having_lower(self, path: &str, value: impl Into<Value>, inclusive: bool) -> IndexResult<Search<'a, K>> {
        let selection = Selection::Range {
            bound: value.into(),
            direction: Direction::Lower,
            inclusive,
        };
        self.search.apply(path, selection, false)
    }
}

/// Accumulated result of a search.
///
/// The accumulator is private to the search; the indexer may change
/// underneath it, and later predicates see the indexer's state at the time
/// they run.
pub struct Search<'a, K: Record> {
    core: &'a Core<K>,
    results: HashSet<K>,
    combinator: Combinator,
}

impl<'a, K: Record> Search<'a, K> {
    fn apply(mut self, path: &str, selection: Selection, negated: bool) -> IndexResult<Self> {
        let core = self.core;
        {
            let state = core.state.read();
            let buckets = selection.buckets(state.store.entry(path)?)?;
            self.combine(&buckets, negated, &state.members);
        }
        core.metrics.increment_predicates_evaluated();
        Ok(self)
    }

    fn combine<V>(&mut self, buckets: &[&HashSet<K>], negated: bool, members: &HashMap<K, V>) {
        let selected = |record: &K| buckets.iter().any(|b| b.contains(record));

        match (self.combinator, negated) {
            (Combinator::And, false) => self.results.retain(|r| selected(r)),
            (Combinator::And, true) => self
                .results
                .retain(|r| members.contains_key(r) && !selected(r)),
            (Combinator::Or, false) => {
                for bucket in buckets {
                    self.results.extend(bucket.iter().cloned());
                }
            }
            (Combinator::Or, true) => self
                .results
                .extend(members.keys().filter(|r| !selected(*r)).cloned()),
        }
    }

    /// Intersect the next predicate with the current results
    pub fn and(mut self) -> Filter<'a, K> {
        self.combinator = Combinator::And;
        Filter { search: self }
    }

    /// Union the next predicate with the current results
    pub fn or(mut self) -> Filter<'a, K> {
        self.combinator = Combinator::Or;
        Filter { search: self }
    }

    /// Replace the results with every member not among them
    pub fn inverse(mut self) -> Self {
        let inverted = {
            let state = self.core.state.read();
            state
                .members
                .keys()
                .filter(|r| !self.results.contains(*r))
                .cloned()
                .collect()
        };
        self.results = inverted;
        self
    }

    pub fn results(&self) -> &HashSet<K> {
        &self.results
    }

    pub fn into_results(self) -> HashSet<K> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn contains(&self, record: &K) -> bool {
        self.results.contains(record)
    }

    /// The only matching record.
    pub fn single_result(&self) -> SearchResult<K> {
        let mut iter = self.results.iter();
        match (iter.next(), self.results.len()) {
            (None, _) => Err(SearchError::EmptyResult),
            (Some(record), 1) => Ok(record.clone()),
            (Some(_), count) => Err(SearchError::MultipleResults { count }),
        }
    }

    /// Results in the record type's natural order
    pub fn sorted_results(&self) -> BTreeSet<K>
    where
        K: Ord,
    {
        ResultSorter::natural(&self.results)
    }

    /// Results ordered by `compare`
    pub fn sorted_results_by<F>(&self, compare: F) -> Vec<K>
    where
        F: FnMut(&K, &K) -> Ordering,
    {
        ResultSorter::by(&self.results, compare)
    }

    /// Results ordered by the values of an attribute path.
    ///
    /// The path needs no index. Records without a value come first in
    /// ascending order.
    pub fn sorted_results_by_path(&self, path: &str, direction: SortDirection) -> IndexResult<Vec<K>> {
        let chain = introspector::resolve::<K>(path)?;
        Ok(ResultSorter::by_path(&self.results, &chain, direction))
    }
}

impl<K: Record> fmt::Debug for Search<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Search")
            .field("results", &self.results.len())
            .field("combinator", &self.combinator)
            .finish()
    }
}

impl<K: Record> fmt::Debug for Filter<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("results", &self.search.results.len())
            .field("combinator", &self.search.combinator)
            .finish()
    }
}

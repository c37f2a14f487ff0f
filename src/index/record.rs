//! Element types an indexer can hold

use std::hash::Hash;

use crate::properties::Introspect;

/// A record the indexer can hold.
///
/// Identity is the type's `Eq`/`Hash`. Records mutated in place while
/// indexed should be shared handles (an `Arc` newtype compared by pointer,
/// for example) so that the indexer and the caller see the same instance.
///
/// Implemented for every type with the required bounds.
pub trait Record: Introspect + Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> Record for T where T: Introspect + Clone + Eq + Hash + Send + Sync + 'static {}

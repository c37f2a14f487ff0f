//! Search subsystem
//!
//! Set-algebra queries over an indexer: equality, membership, negation and
//! range predicates combined with AND/OR, plus on-demand ordering of the
//! results.
//!
//! A search borrows its indexer and owns its result set. It is meant for one
//! thread at a time, even when the indexer is concurrent.

mod errors;
mod filter;
mod sorter;

pub use errors::{SearchError, SearchResult};
pub use filter::{Combinator, Filter, Search};
pub use sorter::{ResultSorter, SortDirection};

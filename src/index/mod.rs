//! Index subsystem
//!
//! Per-path bucket maps over a live member set, kept consistent as records
//! are added, removed and mutated.
//!
//! # Design Principles
//!
//! - Buckets are derived state: the member set plus each path's current
//!   values is the source of truth
//! - In-memory only
//! - Deterministic listings: paths and values come back in a fixed order
//!
//! # Invariants
//!
//! - At most one index per path; changing its kind requires removing it first
//! - Empty buckets are pruned
//! - A new index is backfilled from the current members

mod buckets;
mod errors;
mod indexer;
mod mode;
mod plan;
mod record;
mod store;

pub use buckets::{Comparator, IndexDescriptor, IndexKind, KeyOrder};
pub use errors::{IndexError, IndexResult};
pub use indexer::BeanIndexer;
pub use mode::{Concurrent, Local, Mode};
pub use plan::{DefaultDirective, IndexDirective, IndexPlan};
pub use record::Record;

pub(crate) use buckets::Direction;
pub(crate) use indexer::Core;
pub(crate) use store::IndexEntry;

//! beanindex - in-memory attribute indexes over live records
//!
//! Records of one type are indexed by dotted attribute paths. Indexes stay
//! consistent as records are added and removed, and as observable records
//! announce in-place changes. Searches combine equality, membership,
//! negation and range predicates over the indexes.
//!
//! # Modules
//!
//! - [`properties`]: attribute tables, path resolution and evaluation
//! - [`events`]: change notification for observable records
//! - [`index`]: the indexer, its indexes and declarative index plans
//! - [`search`]: the query algebra
//! - [`observability`]: structured log events and counters
//! - [`config`]: indexer settings

pub mod config;
pub mod events;
pub mod index;
pub mod observability;
pub mod properties;
pub mod search;

pub use config::{ConfigError, IndexerConfig};
pub use events::{ChangeSupport, Observable, PropertyChangeEvent, PropertyChangeListener};
pub use index::{
    BeanIndexer, Comparator, Concurrent, DefaultDirective, IndexDescriptor, IndexDirective,
    IndexError, IndexKind, IndexPlan, IndexResult, Local, Record,
};
pub use properties::{Attribute, BeanRef, BeanType, Introspect, PropertyError, Value, ValueKind};
pub use search::{Filter, Search, SearchError, SearchResult, SortDirection};

//! Attribute path resolution
//!
//! Record types publish an explicit attribute table ([`Introspect`]); dotted
//! paths are resolved once per (type, path) into a [`PropertyChain`] and
//! memoized for the process.
//!
//! # Invariants
//!
//! - Resolution is pure: it reads attribute tables, never records
//! - A published chain is always complete
//! - Evaluation never fails: absent intermediates produce no values
//! - Collection-valued steps are flattened wherever they appear

mod chain;
mod errors;
pub mod introspector;
mod types;
mod value;

pub use chain::{PathValues, PropertyChain, Step};
pub use errors::{PropertyError, PropertyResult};
pub use types::{
    Attribute, BeanType, BeanTypeBuilder, BeanTypeFn, Introspect, PropertyDescriptor, PropertyKind,
};
pub use value::{BeanRef, Value, ValueKind};

//! Concurrency modes of an indexer
//!
//! The mode is a type parameter, so the choice is made at construction and
//! enforced by the compiler:
//!
//! - [`Local`]: the indexer is neither `Send` nor `Sync`. It stays on the
//!   thread that built it, together with every search borrowed from it.
//! - [`Concurrent`]: the indexer is `Send + Sync` and can be shared (for
//!   example behind an `Arc`) by threads that add, remove and search
//!   concurrently.
//!
//! Both modes keep the member set and buckets behind the same internal
//! `RwLock`. `Local` still takes it: change listeners reach the indexer from
//! whichever thread mutates a record, and that thread need not be the owner.
//! The lock is uncontended in single-owner use; the mode only restricts
//! where the indexer handle itself may go.

use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

/// Concurrency mode marker. Sealed.
pub trait Mode: sealed::Sealed + 'static {
    /// Mode name used in log lines
    const NAME: &'static str;
}

/// Single-owner mode (default)
#[derive(Debug)]
pub struct Local(PhantomData<*const ()>);

/// Shared mode
#[derive(Debug)]
pub struct Concurrent;

impl sealed::Sealed for Local {}
impl sealed::Sealed for Concurrent {}

impl Mode for Local {
    const NAME: &'static str = "local";
}

impl Mode for Concurrent {
    const NAME: &'static str = "concurrent";
}

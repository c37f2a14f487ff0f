//! Indexer counters
//!
//! - Counters only, monotonic
//! - One registry per indexer
//! - Thread-safe without locks

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one indexer.
///
/// Counters use `Relaxed` ordering; a snapshot taken while other threads
/// are writing may observe counters from slightly different instants.
#[derive(Debug, Default)]
pub struct IndexerMetrics {
    records_added: AtomicU64,
    records_removed: AtomicU64,
    indexes_created: AtomicU64,
    indexes_removed: AtomicU64,
    changes_applied: AtomicU64,
    changes_ignored: AtomicU64,
    searches_started: AtomicU64,
    predicates_evaluated: AtomicU64,
    stale_buckets: AtomicU64,
}

impl IndexerMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Membership

    /// Count records that became members
    pub fn add_records_added(&self, n: u64) {
        self.records_added.fetch_add(n, Ordering::Relaxed);
    }

    /// Count records that stopped being members
    pub fn add_records_removed(&self, n: u64) {
        self.records_removed.fetch_add(n, Ordering::Relaxed);
    }

    // Index lifecycle

    pub fn increment_indexes_created(&self) {
        self.indexes_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_indexes_removed(&self) {
        self.indexes_removed.fetch_add(1, Ordering::Relaxed);
    }

    // Change notification

    /// A change event was applied to an index
    pub fn increment_changes_applied(&self) {
        self.changes_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// A change event was dropped (non-member or unindexed attribute)
    pub fn increment_changes_ignored(&self) {
        self.changes_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// A removed record was missing from one of its buckets
    pub fn increment_stale_buckets(&self) {
        self.stale_buckets.fetch_add(1, Ordering::Relaxed);
    }

    // Search

    pub fn increment_searches_started(&self) {
        self.searches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_predicates_evaluated(&self) {
        self.predicates_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_added: self.records_added.load(Ordering::Relaxed),
            records_removed: self.records_removed.load(Ordering::Relaxed),
            indexes_created: self.indexes_created.load(Ordering::Relaxed),
            indexes_removed: self.indexes_removed.load(Ordering::Relaxed),
            changes_applied: self.changes_applied.load(Ordering::Relaxed),
            changes_ignored: self.changes_ignored.load(Ordering::Relaxed),
            searches_started: self.searches_started.load(Ordering::Relaxed),
            predicates_evaluated: self.predicates_evaluated.load(Ordering::Relaxed),
            stale_buckets: self.stale_buckets.load(Ordering::Relaxed),
        }
    }

    /// Snapshot as a JSON object
    pub fn to_json(&self) -> String {
        self.snapshot().to_json()
    }
}

/// A point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub records_added: u64,
    pub records_removed: u64,
    pub indexes_created: u64,
    pub indexes_removed: u64,
    pub changes_applied: u64,
    pub changes_ignored: u64,
    pub searches_started: u64,
    pub predicates_evaluated: u64,
    pub stale_buckets: u64,
}

impl MetricsSnapshot {
    /// Serialize as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

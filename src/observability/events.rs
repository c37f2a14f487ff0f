//! Observable indexer events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events in the indexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Index lifecycle
    /// An index was created and backfilled
    IndexCreated,
    /// An index was dropped
    IndexRemoved,
    /// An index plan finished applying
    PlanApplied,

    // Membership
    /// Every member was removed
    RecordsCleared,

    // Change notification
    /// A change event moved a record between buckets
    ChangeApplied,
    /// A change event named an attribute with no index
    ChangeIgnored,
    /// A removed record was missing from a bucket its current value maps to
    StaleBucket,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexRemoved => "INDEX_REMOVED",
            Event::PlanApplied => "PLAN_APPLIED",
            Event::RecordsCleared => "RECORDS_CLEARED",
            Event::ChangeApplied => "CHANGE_APPLIED",
            Event::ChangeIgnored => "CHANGE_IGNORED",
            Event::StaleBucket => "STALE_BUCKET",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ChangeApplied | Event::ChangeIgnored => Severity::Trace,
            Event::StaleBucket => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Observability for the indexer
//!
//! - Structured JSON event lines through the `log` facade
//! - Per-indexer counters
//!
//! # Principles
//!
//! 1. Observability is read-only: nothing here changes indexing results
//! 2. No background threads
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use beanindex::observability::{self, Event};
//!
//! observability::emit(Event::IndexCreated, &[("path", "name")]);
//! println!("{}", indexer.metrics().to_json());
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, TARGET};
pub use metrics::{IndexerMetrics, MetricsSnapshot};

/// Log `event` at its own severity
pub fn emit(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

//! Indexer configuration
//!
//! Only affects what the indexer reports about itself. Index contents and
//! search results never depend on these settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid indexer configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Returns the error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Parse(_) => "BEAN_CONFIG_INVALID",
        }
    }
}

/// Settings for one indexer.
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Log index creation, removal and clears
    pub log_lifecycle: bool,
    /// Log every change event the indexer receives
    pub trace_changes: bool,
    /// Log a warning when `remove` finds a record missing from its bucket
    pub warn_on_stale_buckets: bool,
    /// Capacity reserved for the member set
    pub initial_capacity: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            log_lifecycle: true,
            trace_changes: false,
            warn_on_stale_buckets: true,
            initial_capacity: 0,
        }
    }
}

impl IndexerConfig {
    /// Parse a JSON object
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// No log output at all
    pub fn quiet() -> Self {
        Self {
            log_lifecycle: false,
            trace_changes: false,
            warn_on_stale_buckets: false,
            ..Self::default()
        }
    }

    /// Everything, including per-change tracing
    pub fn verbose() -> Self {
        Self {
            log_lifecycle: true,
            trace_changes: true,
            warn_on_stale_buckets: true,
            ..Self::default()
        }
    }

    /// Set the reserved member capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

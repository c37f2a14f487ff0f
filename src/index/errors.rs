//! Index error types
//!
//! Error codes:
//! - BEAN_INDEX_KIND_CONFLICT
//! - BEAN_NOT_ORDERABLE
//! - BEAN_NO_SUCH_INDEX
//! - BEAN_NOT_SORTED_INDEX
//! - BEAN_INCOMPARABLE_VALUES
//! - BEAN_INVALID_DIRECTIVE
//! - BEAN_UNKNOWN_ATTRIBUTE / BEAN_EMPTY_PATH (from path resolution)
//!
//! All of these are caller misuse. None is retried or recovered internally.

use thiserror::Error;

use super::buckets::IndexKind;
use crate::properties::{PropertyError, ValueKind};

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Index management and lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// An index of the other kind already exists on the path
    #[error("index on '{path}' already exists as {existing}")]
    IndexKindConflict { path: String, existing: IndexKind },

    /// Sorted index requested on values with no natural ordering and no
    /// comparator
    #[error("attribute '{path}' holds {kind} values which have no natural ordering")]
    NotOrderable { path: String, kind: ValueKind },

    /// The path is not indexed
    #[error("no index on '{path}'")]
    NoSuchIndex { path: String },

    /// Range predicate against an unsorted index
    #[error("index on '{path}' is not sorted")]
    NotSortedIndex { path: String },

    /// Range bound and stored keys have different kinds under natural ordering
    #[error("cannot compare {bound} bound with {stored} keys of index '{path}'")]
    IncomparableValues {
        path: String,
        bound: ValueKind,
        stored: ValueKind,
    },

    /// An index plan directive does not fit the attribute
    #[error("invalid directive for '{path}': {reason}")]
    InvalidDirective { path: String, reason: String },

    /// The path did not resolve
    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl IndexError {
    pub(crate) fn no_such_index(path: &str) -> Self {
        IndexError::NoSuchIndex {
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid_directive(path: &str, reason: impl Into<String>) -> Self {
        IndexError::InvalidDirective {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::IndexKindConflict { .. } => "BEAN_INDEX_KIND_CONFLICT",
            IndexError::NotOrderable { .. } => "BEAN_NOT_ORDERABLE",
            IndexError::NoSuchIndex { .. } => "BEAN_NO_SUCH_INDEX",
            IndexError::NotSortedIndex { .. } => "BEAN_NOT_SORTED_INDEX",
            IndexError::IncomparableValues { .. } => "BEAN_INCOMPARABLE_VALUES",
            IndexError::InvalidDirective { .. } => "BEAN_INVALID_DIRECTIVE",
            IndexError::Property(e) => e.code(),
        }
    }

    /// Path the error refers to, when there is one
    pub fn path(&self) -> Option<&str> {
        match self {
            IndexError::IndexKindConflict { path, .. }
            | IndexError::NotOrderable { path, .. }
            | IndexError::NoSuchIndex { path }
            | IndexError::NotSortedIndex { path }
            | IndexError::IncomparableValues { path, .. }
            | IndexError::InvalidDirective { path, .. } => Some(path),
            IndexError::Property(PropertyError::UnknownAttribute { path, .. }) => Some(path),
            IndexError::Property(PropertyError::EmptyPath) => None,
        }
    }
}

//! Search error types
//!
//! Error codes:
//! - BEAN_EMPTY_RESULT
//! - BEAN_MULTIPLE_RESULTS
//! - index error codes, passed through

use thiserror::Error;

use crate::index::IndexError;

/// Result type for search retrieval
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised when reading a single result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// No record matched
    #[error("search matched no records")]
    EmptyResult,

    /// More than one record matched
    #[error("search matched {count} records where one was expected")]
    MultipleResults { count: usize },

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl SearchError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::EmptyResult => "BEAN_EMPTY_RESULT",
            SearchError::MultipleResults { .. } => "BEAN_MULTIPLE_RESULTS",
            SearchError::Index(e) => e.code(),
        }
    }
}

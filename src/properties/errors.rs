//! Property resolution errors
//!
//! Error codes:
//! - BEAN_UNKNOWN_ATTRIBUTE
//! - BEAN_EMPTY_PATH

use thiserror::Error;

/// Result type for property resolution
pub type PropertyResult<T> = Result<T, PropertyError>;

/// Errors raised while resolving an attribute path against a record type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// A segment of the path does not exist on the type at that position
    #[error("unknown attribute '{path}' on {bean}")]
    UnknownAttribute {
        /// Name of the type the segment was looked up on
        bean: String,
        /// Full dotted path as requested
        path: String,
    },

    /// The path had no segments, or an empty segment between dots
    #[error("attribute path is empty")]
    EmptyPath,
}

impl PropertyError {
    /// Create an unknown attribute error
    pub fn unknown(bean: impl Into<String>, path: impl Into<String>) -> Self {
        PropertyError::UnknownAttribute {
            bean: bean.into(),
            path: path.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PropertyError::UnknownAttribute { .. } => "BEAN_UNKNOWN_ATTRIBUTE",
            PropertyError::EmptyPath => "BEAN_EMPTY_PATH",
        }
    }
}

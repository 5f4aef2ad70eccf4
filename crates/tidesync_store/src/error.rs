//! Error types for object store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {key}")]
    NotFound {
        /// The key that was requested.
        key: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key is not acceptable to this store.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The store is temporarily or permanently unavailable.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },
}

impl StoreError {
    /// Creates a retryable unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable unavailability error.
    pub fn unavailable_fatal(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the failed operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable { retryable, .. } => *retryable,
            StoreError::Io(_) => true,
            StoreError::NotFound { .. } | StoreError::InvalidKey(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(StoreError::unavailable("connection reset").is_retryable());
        assert!(!StoreError::unavailable_fatal("bucket deleted").is_retryable());
        assert!(StoreError::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout")).is_retryable());
        assert!(!StoreError::NotFound { key: "a/b".into() }.is_retryable());
        assert!(!StoreError::InvalidKey("../etc".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = StoreError::NotFound { key: "x/y".into() };
        assert_eq!(err.to_string(), "object not found: x/y");
    }
}

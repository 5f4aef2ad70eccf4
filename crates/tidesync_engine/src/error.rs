//! Error types for the sync engine.

use std::io;
use thiserror::Error;
use tidesync_store::StoreError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while transferring or enumerating items.
///
/// Item-level errors never escape the engine; they are absorbed into
/// retry bookkeeping and surfaced through
/// [`SyncEvent::Warning`](crate::SyncEvent::Warning) and
/// [`SyncEvent::Failed`](crate::SyncEvent::Failed) events.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An object store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A local filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A key mapped to a path outside the local directory.
    #[error("key escapes the local directory: {key}")]
    PathEscape {
        /// The offending key.
        key: String,
    },

    /// Enumeration gave up after repeated listing failures.
    #[error("enumeration failed after {attempts} attempts: {message}")]
    EnumerationFailed {
        /// Total listing attempts made.
        attempts: u32,
        /// The last underlying error.
        message: String,
    },
}

impl SyncError {
    /// Returns true if the failed operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Store(e) => e.is_retryable(),
            SyncError::Io(_) => true,
            SyncError::PathEscape { .. } | SyncError::EnumerationFailed { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(SyncError::Store(StoreError::unavailable("reset")).is_retryable());
        assert!(!SyncError::Store(StoreError::NotFound { key: "k".into() }).is_retryable());
        assert!(SyncError::Io(io::Error::new(io::ErrorKind::Interrupted, "eintr")).is_retryable());
        assert!(!SyncError::PathEscape { key: "../x".into() }.is_retryable());
        assert!(!SyncError::EnumerationFailed {
            attempts: 4,
            message: "listing failed".into()
        }
        .is_retryable());
    }
}

//! Failure taxonomy for row locking
//!
//! Two layers: [`StoreError`] covers failures of the external column
//! store, [`LockError`] covers the lock protocol itself. Only the busy
//! condition is ever handled internally (cleanup plus retry-policy
//! consultation); every other error crosses the API boundary unmodified.

use thiserror::Error;

/// Failure from the external column store.
///
/// These are propagated directly by the lock, never suppressed. A release
/// failure is visible to the caller even under scoped-guard usage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A batched write failed.
    #[error("write failed: {0}")]
    Write(String),

    /// A range read failed.
    #[error("read failed: {0}")]
    Read(String),

    /// A batched remove failed.
    #[error("remove failed: {0}")]
    Remove(String),
}

/// All lock protocol errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    /// Invalid configuration or misuse of the protocol. Fatal, never
    /// retried: timeout not strictly below TTL, identity changed after a
    /// column was written, or verification before any write.
    #[error("invalid lock configuration: {0}")]
    InvalidConfig(String),

    /// Another contender holds a live, non-stale column on the row.
    /// Transient; the acquisition loop cleans up and consults the retry
    /// policy, re-raising this once the policy is exhausted.
    #[error("row '{row}' is busy: lock column '{column}' is held")]
    Busy {
        /// Row key of the contended lock.
        row: String,
        /// The other contender's column name.
        column: String,
    },

    /// A stale lock column was found while the instance is configured to
    /// fail on stale locks. The offending column is left untouched for
    /// manual intervention.
    #[error("stale lock column '{column}' on row '{row}': manual cleanup required")]
    StaleLock {
        /// Row key of the lock.
        row: String,
        /// The stale column name.
        column: String,
    },

    /// A lock column holds a value that does not decode as a decimal
    /// microsecond timestamp.
    #[error("corrupt timeout value '{value}' in column '{column}'")]
    Corrupt {
        /// The column whose value failed to decode.
        column: String,
        /// The raw undecodable value.
        value: String,
    },

    /// Store failure, propagated unmodified.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

impl LockError {
    /// Whether a retry with fresh state could succeed.
    ///
    /// Only the busy condition is retryable; everything else is either a
    /// caller bug or needs operator attention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LockError::Busy { .. })
    }

    /// Whether this is the busy (contended) condition.
    pub fn is_busy(&self) -> bool {
        matches!(self, LockError::Busy { .. })
    }

    /// Whether this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, LockError::InvalidConfig(_))
    }
}

//! Trait seams between the lock engine and its collaborators
//!
//! - [`ColumnStore`]: the external wide-column store, reduced to the three
//!   operations the lock protocol needs against a single row
//! - [`Lock`]: the acquire/release capability set
//! - [`RetryPolicy`]: the pluggable backoff strategy for contended
//!   acquisition

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::types::ConsistencyLevel;

/// Client of a wide-column store, scoped to single-row operations.
///
/// Implementations are synchronous and consistency-level-aware. The lock
/// engine issues one batched write, one bounded range read, and (on
/// cleanup) one batched remove per protocol step.
pub trait ColumnStore {
    /// Insert the given columns into `row_key` in one batch, each with the
    /// optional store-side TTL.
    fn write(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        columns: BTreeMap<String, String>,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), StoreError>;

    /// Read the columns of `row_key` whose names fall in `[lower, upper)`,
    /// sorted by name.
    ///
    /// A missing row reads as an empty mapping, not an error. Columns
    /// outside the bounds must not be returned.
    fn read_range(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        lower: &str,
        upper: &str,
    ) -> std::result::Result<BTreeMap<String, String>, StoreError>;

    /// Remove the named columns from `row_key` in one batch.
    fn remove(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        columns: &[String],
    ) -> std::result::Result<(), StoreError>;
}

impl<T: ColumnStore + ?Sized> ColumnStore for &T {
    fn write(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        columns: BTreeMap<String, String>,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), StoreError> {
        (**self).write(consistency, row_key, columns, ttl)
    }

    fn read_range(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        lower: &str,
        upper: &str,
    ) -> std::result::Result<BTreeMap<String, String>, StoreError> {
        (**self).read_range(consistency, row_key, lower, upper)
    }

    fn remove(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        columns: &[String],
    ) -> std::result::Result<(), StoreError> {
        (**self).remove(consistency, row_key, columns)
    }
}

impl<T: ColumnStore + ?Sized> ColumnStore for Arc<T> {
    fn write(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        columns: BTreeMap<String, String>,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), StoreError> {
        (**self).write(consistency, row_key, columns, ttl)
    }

    fn read_range(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        lower: &str,
        upper: &str,
    ) -> std::result::Result<BTreeMap<String, String>, StoreError> {
        (**self).read_range(consistency, row_key, lower, upper)
    }

    fn remove(
        &self,
        consistency: ConsistencyLevel,
        row_key: &str,
        columns: &[String],
    ) -> std::result::Result<(), StoreError> {
        (**self).remove(consistency, row_key, columns)
    }
}

/// The acquire/release capability set.
///
/// Anything resolvable through a lock registry implements this. Callers
/// that only need to bracket a critical section can stay generic over it.
pub trait Lock {
    /// Take the lock, blocking through the retry policy on contention.
    fn acquire(&mut self) -> Result<()>;

    /// Give the lock back. Idempotent; safe to call when `acquire` never
    /// succeeded.
    fn release(&mut self) -> Result<()>;
}

/// Pluggable backoff strategy for contended acquisition.
///
/// A configured policy acts as a stateless template: every acquisition
/// clones it via [`duplicate`](RetryPolicy::duplicate) so each attempt
/// starts with a fresh backoff budget.
pub trait RetryPolicy: Send {
    /// A new instance with identical construction parameters and reset
    /// progress.
    fn duplicate(&self) -> Box<dyn RetryPolicy>;

    /// Whether another attempt should occur. May block the calling thread
    /// to implement backoff.
    fn allow_retry(&mut self) -> bool;
}

//! Core types for row locking
//!
//! This module defines the fundamental types used throughout the system:
//! - [`LockId`]: Unique, roughly time-ordered identifier for one contender
//! - [`ConsistencyLevel`]: Consistency selector for store reads and writes
//! - Column naming helpers for the reserved lock prefix

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default column name prefix reserved for lock columns.
pub const DEFAULT_PREFIX: &str = "_lock_";

/// Unique identifier for one lock contender
///
/// A `LockId` names exactly one contender's column on the lock row. Ids are
/// UUID v7, so their textual form is both globally unique and roughly
/// ordered by creation time. That ordering keeps the lock columns of a row
/// sorted by contention order, which makes manual inspection of a
/// contended row readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(Uuid);

impl LockId {
    /// Create a new time-ordered LockId.
    ///
    /// # Examples
    ///
    /// ```
    /// use rowlock_core::types::LockId;
    ///
    /// let a = LockId::new();
    /// let b = LockId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        LockId(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    ///
    /// Callers that need a stable identity across process restarts can
    /// persist the UUID and rebuild the id from it.
    pub fn from_uuid(uuid: Uuid) -> Self {
        LockId(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LockId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consistency level for reads and writes against the column store
///
/// The lock does not implement consensus itself; contention detection is
/// only as strong as the consistency the store provides for the write and
/// the read-back. Quorum-equivalent levels are the intended operating
/// point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// A single replica acknowledges.
    One,
    /// A quorum of replicas acknowledges.
    Quorum,
    /// A quorum within the local datacenter acknowledges.
    #[default]
    LocalQuorum,
    /// A quorum in every datacenter acknowledges.
    EachQuorum,
    /// Every replica acknowledges.
    All,
}

/// Full column name for a contender: `prefix + lock_id`.
pub fn column_name(prefix: &str, lock_id: &LockId) -> String {
    format!("{prefix}{lock_id}")
}

/// Half-open name range `[lower, upper)` covering every column that starts
/// with `prefix`.
///
/// The upper bound appends the maximum scalar value, so any real column
/// name under the prefix sorts strictly below it. Reads bounded by this
/// range cannot observe unrelated columns sharing the row.
pub fn prefix_range(prefix: &str) -> (String, String) {
    let lower = prefix.to_string();
    let mut upper = prefix.to_string();
    upper.push(char::MAX);
    (lower, upper)
}

/// Current time as microseconds since the unix epoch.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

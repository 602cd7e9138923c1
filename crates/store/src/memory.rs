//! In-memory column store implementation

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rowlock_core::error::StoreError;
use rowlock_core::traits::ColumnStore;
use rowlock_core::types::ConsistencyLevel;

/// One stored column value with its optional store-side expiry.
#[derive(Debug, Clone)]
struct Column {
    value: String,
    expires_at: Option<Instant>,
}

impl Column {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// An in-process wide-column store.
///
/// Rows are keyed by string; each row is a name-sorted column map. TTL is
/// enforced lazily: expired columns become invisible to reads and are
/// purged on the next access to their row, mirroring a store that garbage
/// collects expired cells in the background.
///
/// Consistency levels are accepted and ignored; a single process has
/// nothing weaker to offer than its own memory.
///
/// # Example
///
/// ```
/// use rowlock_core::{ColumnStore, ConsistencyLevel};
/// use rowlock_store::MemoryStore;
/// use std::collections::BTreeMap;
///
/// let store = MemoryStore::new();
/// let mut cols = BTreeMap::new();
/// cols.insert("_lock_a".to_string(), "0".to_string());
/// store.write(ConsistencyLevel::default(), "orders:42", cols, None)?;
///
/// let read = store.read_range(ConsistencyLevel::default(), "orders:42", "_lock_", "_lock_\u{10FFFF}")?;
/// assert_eq!(read.len(), 1);
/// # Ok::<(), rowlock_core::StoreError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, BTreeMap<String, Column>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) columns on a row. Test convenience.
    pub fn column_count(&self, row_key: &str) -> usize {
        let now = Instant::now();
        self.rows
            .read()
            .get(row_key)
            .map(|row| row.values().filter(|c| !c.expired(now)).count())
            .unwrap_or(0)
    }

    fn purge_expired(row: &mut BTreeMap<String, Column>, now: Instant) {
        row.retain(|_, column| !column.expired(now));
    }
}

impl ColumnStore for MemoryStore {
    fn write(
        &self,
        _consistency: ConsistencyLevel,
        row_key: &str,
        columns: BTreeMap<String, String>,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        let mut rows = self.rows.write();
        let row = rows.entry(row_key.to_string()).or_default();
        for (name, value) in columns {
            tracing::trace!(row = row_key, column = %name, "insert column");
            row.insert(name, Column { value, expires_at });
        }
        Ok(())
    }

    fn read_range(
        &self,
        _consistency: ConsistencyLevel,
        row_key: &str,
        lower: &str,
        upper: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let now = Instant::now();
        let mut rows = self.rows.write();
        let Some(row) = rows.get_mut(row_key) else {
            return Ok(BTreeMap::new());
        };
        Self::purge_expired(row, now);
        let out = row
            .range::<str, _>((Bound::Included(lower), Bound::Excluded(upper)))
            .map(|(name, column)| (name.clone(), column.value.clone()))
            .collect();
        if row.is_empty() {
            rows.remove(row_key);
        }
        Ok(out)
    }

    fn remove(
        &self,
        _consistency: ConsistencyLevel,
        row_key: &str,
        columns: &[String],
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if let Some(row) = rows.get_mut(row_key) {
            for name in columns {
                tracing::trace!(row = row_key, column = %name, "remove column");
                row.remove(name);
            }
            Self::purge_expired(row, Instant::now());
            if row.is_empty() {
                rows.remove(row_key);
            }
        }
        Ok(())
    }
}

//! Row lock state machine
//!
//! A [`RowLock`] encodes lock state as columns of a single row in a
//! wide-column store. Acquisition writes a uniquely named lock column,
//! reads back every column under the reserved prefix, and classifies what
//! it sees: only this instance's own live column means held; a stale
//! column is scheduled for cleanup (or rejected); any other live column
//! means busy, which triggers cleanup and a retry-policy consultation.
//!
//! ## What this is, and is not
//!
//! The write-then-read sequence is optimistic, not an atomic test-and-set:
//! two contenders can both write before either reads, and both will then
//! see busy. Classification quality depends entirely on the consistency
//! level chosen for the store operations. This is good-enough mutual
//! exclusion for low-contention rows, not a linearizable fencing service.
//!
//! ## Column layout
//!
//! One row per lock key. Each live contender owns exactly one column named
//! `<prefix><lock_id>`; the value is the decimal microsecond epoch at
//! which that claim goes stale, or `0` for "store TTL only".

use std::collections::{BTreeMap, BTreeSet};

use rowlock_core::codec::{decode_timeout, encode_timeout, NO_TIMEOUT};
use rowlock_core::error::{LockError, Result};
use rowlock_core::traits::{ColumnStore, Lock, RetryPolicy};
use rowlock_core::types::{column_name, now_micros, prefix_range, LockId};
use tracing::{debug, warn};

use crate::config::LockConfig;
use crate::guard::LockGuard;
use crate::retry::RunOnce;

/// A lock over one row of a column store.
///
/// Reusable: after [`release`](Self::release) the instance is back to idle
/// and can [`acquire`](Self::acquire) again. The row itself is shared,
/// store-resident state owned by no instance.
///
/// # Example
///
/// ```
/// use rowlock_engine::RowLock;
/// use rowlock_store::MemoryStore;
/// use std::time::Duration;
///
/// let store = MemoryStore::new();
/// let mut lock = RowLock::builder(&store, "orders:42")
///     .timeout(Duration::from_secs(10))
///     .ttl(Duration::from_secs(30))
///     .build();
///
/// lock.acquire()?;
/// // ... critical section ...
/// lock.release()?;
/// # Ok::<(), rowlock_core::LockError>(())
/// ```
pub struct RowLock<S: ColumnStore> {
    store: S,
    row_key: String,
    config: LockConfig,
    policy: Box<dyn RetryPolicy>,

    // Ephemeral attempt state. An assigned column name means a write went
    // out and must eventually be matched by a release.
    lock_column: Option<String>,
    stale_columns: BTreeSet<String>,
    acquired_at: Option<i64>,
}

impl<S: ColumnStore> RowLock<S> {
    /// A lock on `row_key` with default configuration and the run-once
    /// policy.
    pub fn new(store: S, row_key: impl Into<String>) -> Self {
        Self::with_config(store, row_key, LockConfig::default(), Box::new(RunOnce))
    }

    /// A lock with explicit configuration and retry policy template.
    pub fn with_config(
        store: S,
        row_key: impl Into<String>,
        config: LockConfig,
        policy: Box<dyn RetryPolicy>,
    ) -> Self {
        Self {
            store,
            row_key: row_key.into(),
            config,
            policy,
            lock_column: None,
            stale_columns: BTreeSet::new(),
            acquired_at: None,
        }
    }

    /// Start building a lock on `row_key`.
    pub fn builder(store: S, row_key: impl Into<String>) -> RowLockBuilder<S> {
        RowLockBuilder {
            store,
            row_key: row_key.into(),
            config: LockConfig::default(),
            policy: Box::new(RunOnce),
        }
    }

    /// The row key this lock coordinates on.
    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    /// The configuration in effect.
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// This instance's column name, once a write attempt has fixed it.
    pub fn lock_column(&self) -> Option<&str> {
        self.lock_column.as_deref()
    }

    /// Microsecond epoch of the last successful acquisition, until the
    /// next release.
    pub fn acquired_at(&self) -> Option<i64> {
        self.acquired_at
    }

    /// Change this lock's column identity.
    ///
    /// Only allowed while idle: once an attempt has written a column, the
    /// identity is fixed until release.
    pub fn set_identity(&mut self, prefix: impl Into<String>, lock_id: LockId) -> Result<()> {
        if self.lock_column.is_some() {
            return Err(LockError::InvalidConfig(
                "cannot change prefix or lock_id while a lock column is outstanding".to_string(),
            ));
        }
        self.config.prefix = prefix.into();
        self.config.lock_id = lock_id;
        Ok(())
    }

    /// Acquire the lock.
    ///
    /// Writes this instance's lock column, reads back the row's reserved
    /// prefix range, and classifies the result. On a busy row the own
    /// column (plus any stale columns found) is removed and the retry
    /// policy decides whether to loop; once it declines, the busy error is
    /// returned. Stale-lock and store errors propagate immediately.
    ///
    /// Blocks the calling thread for however long the retry policy sleeps.
    pub fn acquire(&mut self) -> Result<()> {
        if let (Some(timeout), Some(ttl)) = (self.config.timeout, self.config.ttl) {
            if timeout >= ttl {
                return Err(LockError::InvalidConfig(format!(
                    "timeout {timeout:?} must be strictly less than ttl {ttl:?}"
                )));
            }
        }

        let mut retry = self.policy.duplicate();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let now = now_micros();

            self.write_lock_column(now)?;

            match self.verify_lock(now) {
                Ok(()) => {
                    self.acquired_at = Some(now_micros());
                    debug!(
                        row = %self.row_key,
                        column = self.lock_column.as_deref(),
                        attempt,
                        "lock acquired"
                    );
                    return Ok(());
                }
                Err(busy @ LockError::Busy { .. }) => {
                    self.release()?;
                    if !retry.allow_retry() {
                        return Err(busy);
                    }
                    debug!(row = %self.row_key, attempt, "row busy, retrying");
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Release the lock.
    ///
    /// One batched removal covering this instance's own column (if any)
    /// plus every column recorded as stale along the way, then the
    /// ephemeral state is cleared. No-op when there is nothing to remove;
    /// idempotent; safe when `acquire` never succeeded.
    pub fn release(&mut self) -> Result<()> {
        if self.lock_column.is_none() && self.stale_columns.is_empty() {
            return Ok(());
        }

        let mut doomed: Vec<String> = self.stale_columns.iter().cloned().collect();
        if let Some(own) = &self.lock_column {
            doomed.push(own.clone());
        }

        self.store
            .remove(self.config.write_consistency, &self.row_key, &doomed)?;

        debug!(row = %self.row_key, removed = doomed.len(), "lock released");
        self.stale_columns.clear();
        self.lock_column = None;
        self.acquired_at = None;
        Ok(())
    }

    /// Classify the row's lock columns as of `now`.
    ///
    /// Callable only after a write attempt has assigned this instance's
    /// column name. A column with a nonzero stored timeout at or before
    /// `now` is stale: rejected outright under `fail_on_stale_lock`
    /// (without touching the column), otherwise recorded for removal on
    /// the next cleanup. Any other live column that is not our own means
    /// the row is busy.
    pub fn verify_lock(&mut self, now: i64) -> Result<()> {
        let own = self.lock_column.clone().ok_or_else(|| {
            LockError::InvalidConfig(
                "verify_lock called before any lock column was written".to_string(),
            )
        })?;

        for (name, stored) in self.read_lock_columns()? {
            if stored != NO_TIMEOUT && stored <= now {
                if self.config.fail_on_stale_lock {
                    return Err(LockError::StaleLock {
                        row: self.row_key.clone(),
                        column: name,
                    });
                }
                warn!(row = %self.row_key, column = %name, "stale lock column, scheduling removal");
                self.stale_columns.insert(name);
            } else if name != own {
                return Err(LockError::Busy {
                    row: self.row_key.clone(),
                    column: name,
                });
            }
        }
        Ok(())
    }

    /// Read and decode every lock column on the row.
    ///
    /// Bounded to the reserved prefix range, so unrelated columns sharing
    /// the row are never observed.
    pub fn read_lock_columns(&self) -> Result<BTreeMap<String, i64>> {
        let (lower, upper) = prefix_range(&self.config.prefix);
        let raw =
            self.store
                .read_range(self.config.read_consistency, &self.row_key, &lower, &upper)?;

        let mut columns = BTreeMap::new();
        for (name, value) in raw {
            let stored = decode_timeout(&value).map_err(|_| LockError::Corrupt {
                column: name.clone(),
                value: value.clone(),
            })?;
            columns.insert(name, stored);
        }
        Ok(columns)
    }

    /// Administrative sweep of the row, independent of ownership.
    ///
    /// Removes every lock column whose stored timeout is nonzero and has
    /// elapsed, or every lock column when `force` is set, and returns the
    /// pre-deletion snapshot. Manual recovery tool, not part of the
    /// normal acquire/release flow.
    pub fn release_locks(&self, force: bool) -> Result<BTreeMap<String, i64>> {
        let snapshot = self.read_lock_columns()?;
        let now = now_micros();

        let doomed: Vec<String> = snapshot
            .iter()
            .filter(|(_, &stored)| force || (stored != NO_TIMEOUT && stored <= now))
            .map(|(name, _)| name.clone())
            .collect();

        if !doomed.is_empty() {
            self.store
                .remove(self.config.write_consistency, &self.row_key, &doomed)?;
            debug!(row = %self.row_key, removed = doomed.len(), force, "swept lock columns");
        }
        Ok(snapshot)
    }

    /// Acquire and return a guard that releases on every exit path.
    ///
    /// Dropping the guard releases and logs any failure; call
    /// [`LockGuard::release`] instead when the release error matters.
    pub fn acquire_guard(&mut self) -> Result<LockGuard<'_, S>> {
        self.acquire()?;
        Ok(LockGuard::new(self))
    }

    /// Run `f` under the lock.
    ///
    /// Acquires, runs the closure, releases. Release errors propagate; if
    /// the closure panics the guard still releases during unwind.
    pub fn with<T>(&mut self, f: impl FnOnce() -> T) -> Result<T> {
        let guard = self.acquire_guard()?;
        let out = f();
        guard.release()?;
        Ok(out)
    }

    /// Fix the column name on first use and write the lock column.
    fn write_lock_column(&mut self, now: i64) -> Result<()> {
        let name = column_name(&self.config.prefix, &self.config.lock_id);
        match &self.lock_column {
            Some(existing) if *existing != name => {
                return Err(LockError::InvalidConfig(
                    "lock identity changed after the lock column was written".to_string(),
                ));
            }
            Some(_) => {}
            None => self.lock_column = Some(name.clone()),
        }

        let stored = match self.config.timeout {
            None => NO_TIMEOUT,
            Some(timeout) => now + timeout.as_micros() as i64,
        };

        let mut columns = BTreeMap::new();
        columns.insert(name, encode_timeout(stored));
        self.store
            .write(
                self.config.write_consistency,
                &self.row_key,
                columns,
                self.config.ttl,
            )
            .map_err(LockError::from)
    }
}

impl<S: ColumnStore> Lock for RowLock<S> {
    fn acquire(&mut self) -> Result<()> {
        RowLock::acquire(self)
    }

    fn release(&mut self) -> Result<()> {
        RowLock::release(self)
    }
}

/// Builder for [`RowLock`].
///
/// # Example
///
/// ```
/// use rowlock_engine::{ConstantBackoff, RowLock};
/// use rowlock_store::MemoryStore;
/// use std::time::Duration;
///
/// let store = MemoryStore::new();
/// let lock = RowLock::builder(&store, "jobs:nightly")
///     .prefix("_joblock_")
///     .timeout(Duration::from_secs(5))
///     .ttl(Duration::from_secs(20))
///     .fail_on_stale_lock(true)
///     .retry_policy(Box::new(ConstantBackoff::new(Duration::from_millis(50), 3)))
///     .build();
/// # let _ = lock;
/// ```
pub struct RowLockBuilder<S: ColumnStore> {
    store: S,
    row_key: String,
    config: LockConfig,
    policy: Box<dyn RetryPolicy>,
}

impl<S: ColumnStore> RowLockBuilder<S> {
    /// Reserved column-name prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// This contender's identity.
    pub fn lock_id(mut self, lock_id: LockId) -> Self {
        self.config.lock_id = lock_id;
        self
    }

    /// Application-level staleness threshold.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Store the zero sentinel: never stale by application timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Store-side TTL backstop.
    pub fn ttl(mut self, ttl: std::time::Duration) -> Self {
        self.config.ttl = Some(ttl);
        self
    }

    /// Reject stale locks instead of cleaning them up.
    pub fn fail_on_stale_lock(mut self, fail: bool) -> Self {
        self.config.fail_on_stale_lock = fail;
        self
    }

    /// Retry policy template for contended acquisition.
    pub fn retry_policy(mut self, policy: Box<dyn RetryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Consistency level for reads.
    pub fn read_consistency(mut self, level: rowlock_core::ConsistencyLevel) -> Self {
        self.config.read_consistency = level;
        self
    }

    /// Consistency level for writes and removals.
    pub fn write_consistency(mut self, level: rowlock_core::ConsistencyLevel) -> Self {
        self.config.write_consistency = level;
        self
    }

    /// Finish building.
    pub fn build(self) -> RowLock<S> {
        RowLock::with_config(self.store, self.row_key, self.config, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ConstantBackoff;
    use rowlock_core::types::ConsistencyLevel;
    use rowlock_store::MemoryStore;
    use std::time::Duration;

    #[test]
    fn timeout_must_be_strictly_below_ttl() {
        let store = MemoryStore::new();
        let mut lock = RowLock::builder(&store, "row")
            .timeout(Duration::from_secs(2))
            .ttl(Duration::from_secs(1))
            .build();
        assert!(matches!(lock.acquire(), Err(LockError::InvalidConfig(_))));

        let mut equal = RowLock::builder(&store, "row")
            .timeout(Duration::from_secs(1))
            .ttl(Duration::from_secs(1))
            .build();
        assert!(matches!(equal.acquire(), Err(LockError::InvalidConfig(_))));
    }

    #[test]
    fn acquire_writes_exactly_one_column() {
        let store = MemoryStore::new();
        let mut lock = RowLock::new(&store, "row");
        lock.acquire().unwrap();

        let columns = lock.read_lock_columns().unwrap();
        assert_eq!(columns.len(), 1);
        assert!(columns.contains_key(lock.lock_column().unwrap()));
        assert!(lock.acquired_at().is_some());

        lock.release().unwrap();
        assert!(lock.read_lock_columns().unwrap().is_empty());
        assert!(lock.lock_column().is_none());
        assert!(lock.acquired_at().is_none());
    }

    #[test]
    fn no_timeout_stores_the_sentinel() {
        let store = MemoryStore::new();
        let mut lock = RowLock::builder(&store, "row").no_timeout().build();
        lock.acquire().unwrap();

        let columns = lock.read_lock_columns().unwrap();
        assert_eq!(columns.values().copied().collect::<Vec<_>>(), vec![NO_TIMEOUT]);
        lock.release().unwrap();
    }

    #[test]
    fn verify_before_write_is_a_config_error() {
        let store = MemoryStore::new();
        let mut lock = RowLock::new(&store, "row");
        let err = lock.verify_lock(now_micros()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn identity_is_fixed_while_column_outstanding() {
        let store = MemoryStore::new();
        let mut lock = RowLock::new(&store, "row");
        lock.set_identity("_before_", LockId::new()).unwrap();
        lock.acquire().unwrap();

        let err = lock.set_identity("_after_", LockId::new()).unwrap_err();
        assert!(err.is_config());

        lock.release().unwrap();
        lock.set_identity("_after_", LockId::new()).unwrap();
    }

    #[test]
    fn release_is_idempotent_and_noop_when_idle() {
        let store = MemoryStore::new();
        let mut lock = RowLock::new(&store, "row");
        lock.release().unwrap();

        lock.acquire().unwrap();
        lock.release().unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn instance_is_reusable_after_release() {
        let store = MemoryStore::new();
        let mut lock = RowLock::new(&store, "row");
        lock.acquire().unwrap();
        lock.release().unwrap();
        lock.acquire().unwrap();
        assert_eq!(lock.read_lock_columns().unwrap().len(), 1);
        lock.release().unwrap();
    }

    #[test]
    fn second_contender_sees_busy() {
        let store = MemoryStore::new();
        let mut holder = RowLock::new(&store, "row");
        holder.acquire().unwrap();

        let mut contender = RowLock::new(&store, "row");
        let err = contender.acquire().unwrap_err();
        assert!(err.is_busy());
        // The failed attempt cleaned its own column back out.
        assert_eq!(holder.read_lock_columns().unwrap().len(), 1);

        holder.release().unwrap();
    }

    #[test]
    fn busy_error_names_the_holder() {
        let store = MemoryStore::new();
        let mut holder = RowLock::new(&store, "row");
        holder.acquire().unwrap();
        let held = holder.lock_column().unwrap().to_string();

        let mut contender = RowLock::new(&store, "row");
        match contender.acquire().unwrap_err() {
            LockError::Busy { row, column } => {
                assert_eq!(row, "row");
                assert_eq!(column, held);
            }
            other => panic!("expected busy, got {other:?}"),
        }
        holder.release().unwrap();
    }

    #[test]
    fn stale_column_is_cleaned_up_by_next_contender() {
        let store = MemoryStore::new();
        let mut stale = RowLock::builder(&store, "row")
            .timeout(Duration::from_millis(20))
            .build();
        stale.acquire().unwrap();
        std::thread::sleep(Duration::from_millis(40));

        let mut fresh = RowLock::new(&store, "row");
        fresh.acquire().unwrap();

        // The stale column is recorded for deletion and swept together
        // with the fresh column on the next release.
        let columns = fresh.read_lock_columns().unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns.contains_key(fresh.lock_column().unwrap()));

        fresh.release().unwrap();
        assert!(fresh.read_lock_columns().unwrap().is_empty());
    }

    #[test]
    fn fail_on_stale_lock_rejects_and_leaves_the_column() {
        let store = MemoryStore::new();
        let mut stale = RowLock::builder(&store, "row")
            .timeout(Duration::from_millis(20))
            .build();
        stale.acquire().unwrap();
        let stale_column = stale.lock_column().unwrap().to_string();
        std::thread::sleep(Duration::from_millis(40));

        let mut strict = RowLock::builder(&store, "row")
            .fail_on_stale_lock(true)
            .build();
        let err = strict.acquire().unwrap_err();
        assert!(matches!(err, LockError::StaleLock { .. }));

        // The offending column is untouched; the failed contender's own
        // column stays until its release.
        let columns = strict.read_lock_columns().unwrap();
        assert!(columns.contains_key(&stale_column));
        strict.release().unwrap();
        let columns = strict.read_lock_columns().unwrap();
        assert!(columns.contains_key(&stale_column));
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn release_locks_sweeps_elapsed_columns() {
        let store = MemoryStore::new();
        let mut stale = RowLock::builder(&store, "row")
            .timeout(Duration::from_millis(20))
            .build();
        stale.acquire().unwrap();
        let mut live = RowLock::builder(&store, "row")
            .lock_id(LockId::new())
            .timeout(Duration::from_secs(60))
            .build();
        // Write the live column directly; acquire would see contention.
        live.write_lock_column(now_micros()).unwrap();
        std::thread::sleep(Duration::from_millis(40));

        let admin = RowLock::new(&store, "row");
        let snapshot = admin.release_locks(false).unwrap();
        assert_eq!(snapshot.len(), 2);

        let remaining = admin.read_lock_columns().unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains_key(live.lock_column().unwrap()));
    }

    #[test]
    fn release_locks_force_sweeps_everything() {
        let store = MemoryStore::new();
        let mut holder = RowLock::new(&store, "row");
        holder.acquire().unwrap();

        let admin = RowLock::new(&store, "row");
        let snapshot = admin.release_locks(true).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(admin.read_lock_columns().unwrap().is_empty());
    }

    #[test]
    fn corrupt_column_value_is_reported() {
        let store = MemoryStore::new();
        let mut junk = BTreeMap::new();
        junk.insert("_lock_junk".to_string(), "not-a-number".to_string());
        store
            .write(ConsistencyLevel::default(), "row", junk, None)
            .unwrap();

        let mut lock = RowLock::new(&store, "row");
        match lock.acquire().unwrap_err() {
            LockError::Corrupt { column, value } => {
                assert_eq!(column, "_lock_junk");
                assert_eq!(value, "not-a-number");
            }
            other => panic!("expected corrupt, got {other:?}"),
        }
    }

    #[test]
    fn bounded_read_ignores_unrelated_columns() {
        let store = MemoryStore::new();
        let mut data = BTreeMap::new();
        data.insert("payload".to_string(), "arbitrary bytes".to_string());
        store
            .write(ConsistencyLevel::default(), "row", data, None)
            .unwrap();

        let mut lock = RowLock::new(&store, "row");
        lock.acquire().unwrap();
        assert_eq!(lock.read_lock_columns().unwrap().len(), 1);
        lock.release().unwrap();

        // The unrelated column survives lock traffic untouched.
        let all = store
            .read_range(ConsistencyLevel::default(), "row", "", "\u{10FFFF}")
            .unwrap();
        assert_eq!(all.get("payload").map(String::as_str), Some("arbitrary bytes"));
    }

    #[test]
    fn retry_policy_drives_reacquisition() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut holder = RowLock::new(Arc::clone(&store), "row");
        holder.acquire().unwrap();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            holder.release().unwrap();
        });

        let mut waiter = RowLock::builder(Arc::clone(&store), "row")
            .retry_policy(Box::new(ConstantBackoff::new(Duration::from_millis(20), 20)))
            .build();
        waiter.acquire().unwrap();
        handle.join().unwrap();

        assert_eq!(waiter.read_lock_columns().unwrap().len(), 1);
        waiter.release().unwrap();
    }
}

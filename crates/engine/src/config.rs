//! Lock configuration
//!
//! Every knob of the protocol lives in one explicit structure rather than
//! an ad hoc argument bag. Defaults match low-contention coordination on a
//! shared row; see the field docs.

use std::time::Duration;

use rowlock_core::types::{ConsistencyLevel, LockId, DEFAULT_PREFIX};

/// Default application-level staleness threshold.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for one [`RowLock`](crate::RowLock).
///
/// The retry policy template is held by the lock itself (it is a boxed
/// strategy, not plain data); everything else about an acquisition attempt
/// is decided here.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Reserved column-name prefix for lock columns on the row. The row
    /// may carry unrelated columns outside this prefix; the lock never
    /// reads them. Default: `_lock_`.
    pub prefix: String,

    /// This contender's identity. One column named `prefix + lock_id` is
    /// written per acquisition. Default: a fresh time-ordered id.
    pub lock_id: LockId,

    /// Application-level staleness threshold. A held lock older than this
    /// is considered abandoned by other contenders. `None` stores the
    /// zero sentinel: the lock never goes stale and only `ttl` can expire
    /// it. Default: 60 seconds.
    pub timeout: Option<Duration>,

    /// Store-side TTL on the lock column, the backstop against abandoned
    /// locks. When both are set, `timeout` must be strictly below `ttl`.
    /// Default: none.
    pub ttl: Option<Duration>,

    /// Fail acquisition with a stale-lock error instead of cleaning up
    /// discovered stale columns. The offending column is left in place
    /// for manual intervention. Default: false.
    pub fail_on_stale_lock: bool,

    /// Consistency level for the read-back of lock columns.
    /// Default: local quorum.
    pub read_consistency: ConsistencyLevel,

    /// Consistency level for lock column writes and removals.
    /// Default: local quorum.
    pub write_consistency: ConsistencyLevel,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            lock_id: LockId::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            ttl: None,
            fail_on_stale_lock: false,
            read_consistency: ConsistencyLevel::default(),
            write_consistency: ConsistencyLevel::default(),
        }
    }
}

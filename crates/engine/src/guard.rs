//! Scoped-resource wrapper for a held lock
//!
//! [`LockGuard`] brackets a critical section: it is handed out by
//! [`RowLock::acquire_guard`](crate::RowLock::acquire_guard) and releases
//! the lock on every exit path. `Drop` cannot surface a failed release, so
//! the drop path logs at error level; callers who need the release result
//! use [`LockGuard::release`] or
//! [`RowLock::with`](crate::RowLock::with).

use rowlock_core::error::Result;
use rowlock_core::traits::ColumnStore;

use crate::lock::RowLock;

/// A held row lock, released when the guard goes out of scope.
///
/// # Example
///
/// ```
/// use rowlock_engine::RowLock;
/// use rowlock_store::MemoryStore;
///
/// let store = MemoryStore::new();
/// let mut lock = RowLock::new(&store, "orders:42");
///
/// {
///     let guard = lock.acquire_guard()?;
///     // ... critical section ...
///     guard.release()?;
/// }
/// # Ok::<(), rowlock_core::LockError>(())
/// ```
pub struct LockGuard<'a, S: ColumnStore> {
    lock: Option<&'a mut RowLock<S>>,
}

impl<'a, S: ColumnStore> LockGuard<'a, S> {
    pub(crate) fn new(lock: &'a mut RowLock<S>) -> Self {
        Self { lock: Some(lock) }
    }

    /// Release explicitly, surfacing any store failure.
    pub fn release(mut self) -> Result<()> {
        match self.lock.take() {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }

    /// The guarded lock's own column name.
    pub fn lock_column(&self) -> Option<&str> {
        self.lock.as_ref().and_then(|lock| lock.lock_column())
    }
}

impl<S: ColumnStore> Drop for LockGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            if let Err(error) = lock.release() {
                tracing::error!(
                    row = %lock.row_key(),
                    %error,
                    "failed to release row lock on guard drop"
                );
            }
        }
    }
}

//! Convenient imports for rowlock.
//!
//! ```
//! use rowlock::prelude::*;
//!
//! let store = MemoryStore::new();
//! let mut lock = RowLock::new(&store, "orders:42");
//! lock.acquire()?;
//! lock.release()?;
//! # Ok::<(), LockError>(())
//! ```

// The lock and its configuration
pub use crate::{LockConfig, LockGuard, RowLock, RowLockBuilder};

// Error handling
pub use crate::{LockError, Result, StoreError};

// Contracts
pub use crate::{ColumnStore, Lock, RetryPolicy};

// Retry policies
pub use crate::{ConstantBackoff, ExponentialBackoff, RunOnce};

// Core types
pub use crate::{ConsistencyLevel, LockId};

// In-process backend
pub use crate::MemoryStore;

//! # rowlock
//!
//! Mutual exclusion over a logical resource, encoded as columns inside a
//! single row of a wide-column store. Best used when the application
//! already keeps its data in such a store and wants good-enough safety
//! around a critical section on a low-contention row; this is not a
//! linearizable fencing service.
//!
//! ## Quick Start
//!
//! ```
//! use rowlock::prelude::*;
//! use std::time::Duration;
//!
//! let store = MemoryStore::new();
//!
//! let mut lock = RowLock::builder(&store, "orders:42")
//!     .timeout(Duration::from_secs(10))
//!     .ttl(Duration::from_secs(30))
//!     .build();
//!
//! lock.with(|| {
//!     // ... critical section ...
//! })?;
//! # Ok::<(), rowlock::LockError>(())
//! ```
//!
//! ## How it works
//!
//! Acquisition writes one uniquely named lock column, reads back every
//! column under the reserved prefix and classifies the result: only this
//! instance's live column means held; another live column means busy,
//! triggering cleanup and the retry policy; a column whose application
//! timeout has elapsed is stale and gets swept (or rejected, when
//! configured to fail on stale locks). Store-side TTL is the backstop
//! against abandoned locks.
//!
//! ## Pieces
//!
//! - [`RowLock`] - the lock state machine
//! - [`LockConfig`] - explicit configuration with documented defaults
//! - [`RunOnce`], [`ConstantBackoff`], [`ExponentialBackoff`] - retry
//!   policies; implement [`RetryPolicy`] for custom backoff
//! - [`ColumnStore`] - the seam to a real wide-column store client;
//!   [`MemoryStore`] is the in-process implementation
//! - [`LockRegistry`], [`RetryPolicyRegistry`] - caller-owned named
//!   lookup, for configuration-driven wiring

#![warn(missing_docs)]

mod registry;

pub mod prelude;

pub use registry::{LockRegistry, RetryPolicyRegistry};

// Contracts and vocabulary
pub use rowlock_core::codec::{decode_timeout, encode_timeout, NO_TIMEOUT};
pub use rowlock_core::error::{LockError, Result, StoreError};
pub use rowlock_core::traits::{ColumnStore, Lock, RetryPolicy};
pub use rowlock_core::types::{ConsistencyLevel, LockId, DEFAULT_PREFIX};

// The lock engine
pub use rowlock_engine::{
    ConstantBackoff, ExponentialBackoff, LockConfig, LockGuard, RowLock, RowLockBuilder, RunOnce,
};

// In-process store backend
pub use rowlock_store::MemoryStore;

//! Row lock engine
//!
//! The lock state machine and its collaborators:
//! - [`RowLock`]: acquire/verify/release over one row of a column store
//! - [`LockConfig`]: explicit configuration with documented defaults
//! - [`retry`]: the pluggable backoff policies
//! - [`LockGuard`]: scoped-resource wrapper releasing on every exit path

pub mod config;
pub mod guard;
pub mod lock;
pub mod retry;

pub use config::LockConfig;
pub use guard::LockGuard;
pub use lock::{RowLock, RowLockBuilder};
pub use retry::{ConstantBackoff, ExponentialBackoff, RunOnce};

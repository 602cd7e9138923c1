//! Core types and contracts for row locking
//!
//! This crate defines the vocabulary shared by every other crate in the
//! workspace:
//! - [`types`]: lock identifiers, column naming, consistency levels, the
//!   microsecond epoch clock
//! - [`codec`]: the stored timeout value encoding
//! - [`error`]: the failure taxonomy
//! - [`traits`]: the `ColumnStore`, `Lock` and `RetryPolicy` seams

pub mod codec;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{LockError, Result, StoreError};
pub use traits::{ColumnStore, Lock, RetryPolicy};
pub use types::{ConsistencyLevel, LockId};

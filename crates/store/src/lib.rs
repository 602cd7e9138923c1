//! In-process wide-column store
//!
//! [`MemoryStore`] implements the [`ColumnStore`] contract against plain
//! process memory: rows are sorted column maps, store-side TTL is honored
//! at read and remove time. It is the primary backend for tests and the
//! reference for wiring a real wide-column client to the lock engine.
//!
//! [`ColumnStore`]: rowlock_core::ColumnStore

mod memory;

pub use memory::MemoryStore;

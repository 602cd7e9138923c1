//! Named lookup for lock and retry-policy implementations
//!
//! Configuration-driven callers resolve implementations by name ("give me
//! the `run_once` policy"). The registries here are plain, caller-owned
//! factory maps: the caller builds one, registers what it needs, and
//! passes it around explicitly. There is no process-wide registration
//! state.

use std::collections::HashMap;

use rowlock_core::traits::{Lock, RetryPolicy};
use rowlock_engine::{ExponentialBackoff, RunOnce};

type PolicyFactory = Box<dyn Fn() -> Box<dyn RetryPolicy>>;
type LockFactory = Box<dyn Fn() -> Box<dyn Lock>>;

/// Named retry-policy factories.
///
/// # Example
///
/// ```
/// use rowlock::RetryPolicyRegistry;
///
/// let registry = RetryPolicyRegistry::with_defaults();
/// let mut policy = registry.get("run_once").unwrap();
/// assert!(!policy.allow_retry());
/// ```
#[derive(Default)]
pub struct RetryPolicyRegistry {
    factories: HashMap<String, PolicyFactory>,
}

impl RetryPolicyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-seeded with the built-in policies that need no
    /// parameters: `run_once` and `exponential` (default backoff
    /// schedule).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("run_once", || Box::new(RunOnce));
        registry.register("exponential", || Box::<ExponentialBackoff>::default());
        registry
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn RetryPolicy> + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Build a fresh policy instance by name.
    pub fn get(&self, name: &str) -> Option<Box<dyn RetryPolicy>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Registered names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// Named lock factories.
///
/// Factories capture their store, row key and configuration; the registry
/// only resolves names to ready-to-use [`Lock`] instances.
///
/// # Example
///
/// ```
/// use rowlock::{Lock, LockRegistry, MemoryStore, RowLock};
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryStore::new());
/// let mut registry = LockRegistry::new();
/// registry.register("orders", move || {
///     Box::new(RowLock::new(Arc::clone(&store), "orders:42"))
/// });
///
/// let mut lock = registry.get("orders").unwrap();
/// lock.acquire()?;
/// lock.release()?;
/// # Ok::<(), rowlock::LockError>(())
/// ```
#[derive(Default)]
pub struct LockRegistry {
    factories: HashMap<String, LockFactory>,
}

impl LockRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Lock> + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Build a fresh lock instance by name.
    pub fn get(&self, name: &str) -> Option<Box<dyn Lock>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Registered names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

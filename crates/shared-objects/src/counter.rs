//! # Counter
//!
//! Named atomic integer. The message bus uses a private one to assign
//! message IDs.

use crate::identity::{ObjectKind, SharedObject, SharedObjectId, SharedObjectKind};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Atomic integer shared under a name.
///
/// Arithmetic wraps on overflow.
pub trait Counter: SharedObject {
    /// Current value.
    fn get(&self) -> i64;

    /// Overwrite the current value.
    fn set(&self, value: i64);

    /// Return the current value, then add one.
    fn get_and_increment(&self) -> i64;

    /// Add one, then return the new value.
    fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Subtract one, then return the new value.
    fn decrement_and_get(&self) -> i64 {
        self.add_and_get(-1)
    }

    /// Return the current value, then add `delta`.
    fn get_and_add(&self, delta: i64) -> i64;

    /// Add `delta`, then return the new value.
    fn add_and_get(&self, delta: i64) -> i64 {
        self.get_and_add(delta).wrapping_add(delta)
    }

    /// Set to `new` if the current value equals `expected`.
    ///
    /// Returns whether the swap happened.
    fn compare_and_set(&self, expected: i64, new: i64) -> bool;
}

/// Process-local counter backed by an `AtomicI64`.
#[derive(Debug)]
pub struct LocalCounter {
    name: String,
    value: AtomicI64,
}

impl LocalCounter {
    /// Create a counter starting at zero.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_initial(name, 0)
    }

    /// Create a counter starting at `initial`.
    #[must_use]
    pub fn with_initial(name: impl Into<String>, initial: i64) -> Self {
        Self {
            name: name.into(),
            value: AtomicI64::new(initial),
        }
    }
}

impl SharedObject for LocalCounter {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Counter for LocalCounter {
    fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    fn set(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    fn get_and_increment(&self) -> i64 {
        self.value.fetch_add(1, Ordering::SeqCst)
    }

    fn get_and_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst)
    }

    fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Kind marker for counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterKind;

impl SharedObjectKind for CounterKind {
    const KIND: ObjectKind = ObjectKind::Counter;
    type Object = dyn Counter;
    type Context = ();

    fn create_default_implementation(id: &SharedObjectId<Self>, _context: &()) -> Arc<dyn Counter> {
        Arc::new(LocalCounter::new(id.name()))
    }
}

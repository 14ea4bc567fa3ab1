//! # Shared Box
//!
//! Named single-value cell.

use crate::identity::{ObjectKind, SharedObject, SharedObjectId, SharedObjectKind};
use crate::Value;
use parking_lot::RwLock;
use std::sync::Arc;

/// A single optional value shared under a name.
pub trait SharedBox: SharedObject {
    /// Current value, if any.
    fn get(&self) -> Option<Value>;

    /// Replace the value.
    fn set(&self, value: Value);

    /// Replace the value and return the previous one.
    fn get_and_set(&self, value: Value) -> Option<Value>;

    /// Replace the value with `new` only if it currently equals `expected`
    /// (`None` meaning empty). Returns whether the swap happened.
    fn compare_and_set(&self, expected: Option<&Value>, new: Value) -> bool;

    /// Empty the box, returning the previous value.
    fn clear(&self) -> Option<Value>;
}

/// Process-local box guarded by a read/write lock.
#[derive(Debug)]
pub struct LocalBox {
    name: String,
    value: RwLock<Option<Value>>,
}

impl LocalBox {
    /// Create an empty box.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: RwLock::new(None),
        }
    }
}

impl SharedObject for LocalBox {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&self) {
        self.value.write().take();
    }
}

impl SharedBox for LocalBox {
    fn get(&self) -> Option<Value> {
        self.value.read().clone()
    }

    fn set(&self, value: Value) {
        *self.value.write() = Some(value);
    }

    fn get_and_set(&self, value: Value) -> Option<Value> {
        self.value.write().replace(value)
    }

    fn compare_and_set(&self, expected: Option<&Value>, new: Value) -> bool {
        let mut current = self.value.write();
        if current.as_ref() != expected {
            return false;
        }
        *current = Some(new);
        true
    }

    fn clear(&self) -> Option<Value> {
        self.value.write().take()
    }
}

/// Kind marker for boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxKind;

impl SharedObjectKind for BoxKind {
    const KIND: ObjectKind = ObjectKind::Box;
    type Object = dyn SharedBox;
    type Context = ();

    fn create_default_implementation(id: &SharedObjectId<Self>, _context: &()) -> Arc<dyn SharedBox> {
        Arc::new(LocalBox::new(id.name()))
    }
}

//! # Key/Value Store
//!
//! Named in-memory map. File-backed record storage is a separate concern
//! and lives outside this crate.

use crate::identity::{ObjectKind, SharedObject, SharedObjectId, SharedObjectKind};
use crate::Value;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// String-keyed map shared under a name.
pub trait KeyValueStore: SharedObject {
    /// Value for `key`, if present.
    fn get(&self, key: &str) -> Option<Value>;

    /// Insert `value`, returning the previous value for `key`.
    fn put(&self, key: &str, value: Value) -> Option<Value>;

    /// Insert `value` only if `key` is absent. Returns the existing value
    /// when the insert did not happen.
    fn put_if_absent(&self, key: &str, value: Value) -> Option<Value>;

    /// Remove `key`, returning its value.
    fn remove(&self, key: &str) -> Option<Value>;

    /// Whether `key` is present.
    fn contains_key(&self, key: &str) -> bool;

    /// All keys in ascending order.
    fn keys(&self) -> Vec<String>;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the store has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    fn clear(&self);
}

/// Process-local store over an ordered map.
#[derive(Debug)]
pub struct LocalStore {
    name: String,
    entries: RwLock<BTreeMap<String, Value>>,
}

impl LocalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl SharedObject for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&self) {
        let mut entries = self.entries.write();
        debug!(store = %self.name, entries = entries.len(), "Store released");
        entries.clear();
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) -> Option<Value> {
        self.entries.write().insert(key.to_string(), value)
    }

    fn put_if_absent(&self, key: &str, value: Value) -> Option<Value> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key) {
            return Some(existing.clone());
        }
        entries.insert(key.to_string(), value);
        None
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.entries.write().remove(key)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Kind marker for key/value stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreKind;

impl SharedObjectKind for StoreKind {
    const KIND: ObjectKind = ObjectKind::Store;
    type Object = dyn KeyValueStore;
    type Context = ();

    fn create_default_implementation(
        id: &SharedObjectId<Self>,
        _context: &(),
    ) -> Arc<dyn KeyValueStore> {
        Arc::new(LocalStore::new(id.name()))
    }
}

//! # Shared Object Identity
//!
//! Typed, immutable identifiers for named shared objects.
//!
//! A `SharedObjectId<K>` is the pair (kind, name). The kind is carried in the
//! type parameter, so a counter id and a communicator id with the same name
//! never compare equal and can never be handed to the wrong repository.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Anything that can be looked up by name and released by its repository.
pub trait SharedObject: Send + Sync {
    /// The name this object was registered under.
    fn name(&self) -> &str;

    /// Finalize the object. Called exactly once by the owning repository when
    /// the entry is released or the repository is cleared.
    fn release(&self) {}
}

/// Logical kind of a shared object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Atomic integer generator.
    Counter,
    /// Single-value cell.
    Box,
    /// Key/value map.
    Store,
    /// Publish/subscribe message bus.
    Communicator,
}

impl ObjectKind {
    /// Stable lowercase label used in logs and keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Box => "box",
            Self::Store => "store",
            Self::Communicator => "communicator",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-level description of one kind of shared object.
///
/// Implementors are zero-sized markers (`CounterKind`, `BoxKind`, ...) that
/// name the object trait handed out for the kind and know how to build the
/// process-local default.
pub trait SharedObjectKind: Sized + Send + Sync + 'static {
    /// Runtime tag for this kind.
    const KIND: ObjectKind;

    /// Object type handed out by repositories of this kind.
    type Object: SharedObject + ?Sized;

    /// Dependencies the default implementation needs (executor, node identity).
    type Context: Send + Sync + 'static;

    /// Build the default local implementation for `id`.
    ///
    /// Must only construct the object: no registration, no I/O, no failure.
    fn create_default_implementation(
        id: &SharedObjectId<Self>,
        context: &Self::Context,
    ) -> Arc<Self::Object>;
}

/// Identifier of a named shared object of kind `K`.
pub struct SharedObjectId<K> {
    name: Arc<str>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: SharedObjectKind> SharedObjectId<K> {
    /// Create an identifier for `name`.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            _kind: PhantomData,
        }
    }

    /// The object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The object kind.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        K::KIND
    }

    /// Kind-erased key, comparable across kinds.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: K::KIND,
            name: Arc::clone(&self.name),
        }
    }

    /// Construct the default local implementation for this identifier.
    #[must_use]
    pub fn create_default_implementation(&self, context: &K::Context) -> Arc<K::Object> {
        K::create_default_implementation(self, context)
    }
}

impl<K> Clone for SharedObjectId<K> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _kind: PhantomData,
        }
    }
}

impl<K: SharedObjectKind> PartialEq for SharedObjectId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<K: SharedObjectKind> Eq for SharedObjectId<K> {}

impl<K: SharedObjectKind> Hash for SharedObjectId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        K::KIND.hash(state);
        self.name.hash(state);
    }
}

impl<K: SharedObjectKind> fmt::Debug for SharedObjectId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObjectId")
            .field("kind", &K::KIND)
            .field("name", &self.name)
            .finish()
    }
}

impl<K: SharedObjectKind> fmt::Display for SharedObjectId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", K::KIND, self.name)
    }
}

/// Kind-erased identifier: (kind, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Object kind.
    pub kind: ObjectKind,
    /// Object name.
    pub name: Arc<str>,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

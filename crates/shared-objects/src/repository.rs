//! # Shared Object Repository
//!
//! Directory of named objects of one kind with at most one live instance per
//! name.
//!
//! ## Get-or-create protocol
//!
//! 1. Shared (read) lookup. Hits never contend with each other.
//! 2. On a miss, take the exclusive (write) lock and look again: another
//!    caller may have created the entry between the two locks.
//! 3. Only then run the factory and insert. A failing factory leaves the map
//!    untouched.
//!
//! Finalization (`SharedObject::release`) always runs after the lock is
//! dropped, so an object's teardown can never block lookups of other names.

use crate::errors::RepositoryError;
use crate::identity::{SharedObject, SharedObjectId, SharedObjectKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Factory used on a repository miss.
pub type ObjectFactory<K> = Box<
    dyn Fn(&SharedObjectId<K>) -> Result<Arc<<K as SharedObjectKind>::Object>, RepositoryError>
        + Send
        + Sync,
>;

/// Name → instance directory for one object kind.
pub struct SharedObjectRepository<K: SharedObjectKind> {
    /// Live entries.
    objects: RwLock<HashMap<SharedObjectId<K>, Arc<K::Object>>>,

    /// Constructor for missing entries.
    factory: ObjectFactory<K>,
}

impl<K: SharedObjectKind> SharedObjectRepository<K> {
    /// Create a repository that builds the kind's default local
    /// implementation on a miss.
    #[must_use]
    pub fn new(context: K::Context) -> Self {
        Self::with_factory(move |id: &SharedObjectId<K>| {
            Ok(id.create_default_implementation(&context))
        })
    }

    /// Create a repository with a custom, possibly failing, factory.
    #[must_use]
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&SharedObjectId<K>) -> Result<Arc<K::Object>, RepositoryError> + Send + Sync + 'static,
    {
        Self {
            objects: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    /// Existing instance for `name`, or a newly constructed one.
    ///
    /// # Errors
    ///
    /// `RepositoryError::ConstructionFailure` if the factory fails. No entry
    /// is stored in that case.
    pub fn get_shared_object(&self, name: &str) -> Result<Arc<K::Object>, RepositoryError> {
        self.get(&SharedObjectId::<K>::new(name))
    }

    /// Existing instance for `id`, or a newly constructed one.
    ///
    /// # Errors
    ///
    /// See [`Self::get_shared_object`].
    pub fn get(&self, id: &SharedObjectId<K>) -> Result<Arc<K::Object>, RepositoryError> {
        if let Some(existing) = self.objects.read().get(id) {
            return Ok(Arc::clone(existing));
        }

        let mut objects = self.objects.write();
        if let Some(existing) = objects.get(id) {
            debug!(object = %id, "Shared object created by a concurrent caller");
            return Ok(Arc::clone(existing));
        }

        let object = match (self.factory)(id) {
            Ok(object) => object,
            Err(e) => {
                warn!(object = %id, error = %e, "Shared object construction failed");
                return Err(e);
            }
        };
        objects.insert(id.clone(), Arc::clone(&object));
        debug!(object = %id, live = objects.len(), "Shared object created");

        Ok(object)
    }

    /// Existing instance for `name` without creating one.
    #[must_use]
    pub fn get_if_present(&self, name: &str) -> Option<Arc<K::Object>> {
        self.objects.read().get(&SharedObjectId::<K>::new(name)).cloned()
    }

    /// Remove and finalize `name`. Returns whether an entry existed.
    pub fn release_shared_object(&self, name: &str) -> bool {
        let id = SharedObjectId::<K>::new(name);
        let removed = self.objects.write().remove(&id);

        match removed {
            Some(object) => {
                object.release();
                debug!(object = %id, "Shared object released");
                true
            }
            None => false,
        }
    }

    /// Finalize and remove every entry.
    pub fn release_all(&self) {
        let drained: Vec<_> = self.objects.write().drain().collect();
        if drained.is_empty() {
            return;
        }

        let count = drained.len();
        for (_, object) in drained {
            object.release();
        }
        info!(kind = %K::KIND, released = count, "Released all shared objects");
    }

    /// Whether `name` has a live entry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.objects.read().contains_key(&SharedObjectId::<K>::new(name))
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Names of live entries in ascending order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .read()
            .keys()
            .map(|id| id.name().to_string())
            .collect();
        names.sort();
        names
    }
}

impl<K: SharedObjectKind<Context = ()>> Default for SharedObjectRepository<K> {
    fn default() -> Self {
        Self::new(())
    }
}

impl<K: SharedObjectKind> fmt::Debug for SharedObjectRepository<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObjectRepository")
            .field("kind", &K::KIND)
            .field("names", &self.names())
            .finish()
    }
}

impl<K: SharedObjectKind> Drop for SharedObjectRepository<K> {
    fn drop(&mut self) {
        self.release_all();
    }
}

//! # Shared Objects - Named Primitives with a Local Fallback
//!
//! Every shared primitive (counter, box, key/value store, message bus) is
//! addressed by a typed identifier and handed out by a repository that keeps
//! at most one live instance per name.
//!
//! ## Lookup Flow
//!
//! ```text
//! caller ──get_shared_object("jobs")──► SharedObjectRepository<CounterKind>
//!                                           │ read lock: hit? ──► Arc<dyn Counter>
//!                                           │ miss
//!                                           ▼
//!                                      write lock, re-check
//!                                           │ still missing
//!                                           ▼
//!                          SharedObjectId::create_default_implementation()
//! ```
//!
//! A cluster backend replaces the default factory; the process-local
//! implementations in this crate are what callers get when none is present.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod counter;
pub mod errors;
pub mod identity;
pub mod repository;
pub mod shared_box;
pub mod store;

// Re-export main types
pub use counter::{Counter, CounterKind, LocalCounter};
pub use errors::RepositoryError;
pub use identity::{ObjectKey, ObjectKind, SharedObject, SharedObjectId, SharedObjectKind};
pub use repository::{ObjectFactory, SharedObjectRepository};
pub use shared_box::{BoxKind, LocalBox, SharedBox};
pub use store::{KeyValueStore, LocalStore, StoreKind};

/// Opaque application value carried by boxes, stores and bus messages.
pub type Value = serde_json::Value;

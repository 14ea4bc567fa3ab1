//! Repository error types.

use crate::identity::ObjectKind;
use thiserror::Error;

/// Errors from shared object repositories.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The factory for a new named object failed; nothing was stored.
    #[error("Failed to construct {kind} '{name}': {reason}")]
    ConstructionFailure {
        kind: ObjectKind,
        name: String,
        reason: String,
    },
}

impl RepositoryError {
    /// Build a construction failure for `kind`/`name`.
    pub fn construction(kind: ObjectKind, name: &str, reason: impl Into<String>) -> Self {
        Self::ConstructionFailure {
            kind,
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

//! Runtime error types.

use shared_bus::CommunicatorError;
use shared_objects::RepositoryError;
use thiserror::Error;

/// Errors from runtime setup and the shared object provider.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Tokio executor requested outside of a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Communicator(#[from] CommunicatorError),
}

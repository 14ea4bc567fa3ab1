//! Communicator error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by Communicator receive and request operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommunicatorError {
    /// No matching message arrived in time. The wait left no subscription
    /// behind.
    #[error("No matching message within {timeout:?}")]
    Timeout {
        /// The wait that elapsed.
        timeout: Duration,
    },

    /// The Communicator was released while the caller was waiting.
    #[error("Communicator released while waiting for a message")]
    Interrupted,

    /// The message box was closed and has nothing left to deliver.
    #[error("Message box closed")]
    Closed,

    /// A bounded message box was asked for zero capacity.
    #[error("Message box capacity must be greater than zero")]
    InvalidCapacity,

    /// A blocking wait could not start the timer it needs for its deadline.
    #[error("Failed to start blocking wait: {0}")]
    WaitRuntime(String),
}

/// Result type for Communicator operations.
pub type Result<T> = std::result::Result<T, CommunicatorError>;

//! # Shared Runtime
//!
//! Wiring for applications that use shared objects: configuration from the
//! environment, logging setup and the `LocalSharedObjects` provider.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shared_runtime::{init_logging, LocalSharedObjects, RuntimeConfig, SharedObjectProvider};
//!
//! let config = RuntimeConfig::from_env();
//! init_logging(&config)?;
//!
//! let objects = LocalSharedObjects::new(config)?;
//! let jobs = objects.counter("jobs")?;
//! jobs.increment_and_get();
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SHARED_NODE_NAME` | `shared-node` | Node name in logs |
//! | `SHARED_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also accepted) |
//! | `SHARED_JSON_LOGS` | `false` | JSON formatted logs |
//! | `SHARED_EXECUTOR` | `local` | `local` worker thread or `tokio` tasks |
//! | `SHARED_REQUEST_TIMEOUT_MS` | `5000` | Provider request deadline |
//! | `SHARED_MAILBOX_CAPACITY` | `1000` | Provider bounded box capacity |

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod errors;
pub mod provider;
pub mod telemetry;

// Re-export main types
pub use config::{ExecutorMode, RuntimeConfig};
pub use errors::RuntimeError;
pub use provider::{LocalSharedObjects, SharedObjectProvider};
pub use telemetry::init_logging;

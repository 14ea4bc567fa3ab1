//! Runtime configuration from environment variables.

use crate::errors::RuntimeError;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which executor delivers bus messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorMode {
    /// One dedicated worker thread per provider, FIFO delivery.
    #[default]
    Local,
    /// Tasks on the ambient tokio runtime.
    Tokio,
}

impl FromStr for ExecutorMode {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "tokio" => Ok(Self::Tokio),
            other => Err(RuntimeError::Config(format!("unknown executor mode '{other}'"))),
        }
    }
}

impl fmt::Display for ExecutorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Tokio => write!(f, "tokio"),
        }
    }
}

/// Configuration for a shared object provider.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Node name used in logs and the delivery thread name
    pub node_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Delivery executor
    pub executor: ExecutorMode,

    /// Deadline for `send_request` through the provider
    pub request_timeout: Duration,

    /// Capacity of bounded message boxes created through the provider
    pub mailbox_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            node_name: "shared-node".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            executor: ExecutorMode::Local,
            request_timeout: Duration::from_millis(shared_bus::DEFAULT_REQUEST_TIMEOUT_MS),
            mailbox_capacity: shared_bus::DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHARED_NODE_NAME`: Node name (default: shared-node)
    /// - `SHARED_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SHARED_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `SHARED_EXECUTOR`: `local` or `tokio` (default: local)
    /// - `SHARED_REQUEST_TIMEOUT_MS`: Request deadline in milliseconds (default: 5000)
    /// - `SHARED_MAILBOX_CAPACITY`: Bounded message box capacity (default: 1000)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            node_name: env::var("SHARED_NODE_NAME").unwrap_or(defaults.node_name),

            log_level: env::var("SHARED_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: env::var("SHARED_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.json_logs),

            executor: env::var("SHARED_EXECUTOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.executor),

            request_timeout: env::var("SHARED_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),

            mailbox_capacity: env::var("SHARED_MAILBOX_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.mailbox_capacity),
        }
    }

    /// Reject values the provider cannot run with.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.node_name.trim().is_empty() {
            return Err(RuntimeError::Config("node name must not be empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(RuntimeError::Config("request timeout must be positive".into()));
        }
        if self.mailbox_capacity == 0 {
            return Err(RuntimeError::Config("mailbox capacity must be positive".into()));
        }
        Ok(())
    }
}

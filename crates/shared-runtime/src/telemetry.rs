//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` fmt subscriber. `RUST_LOG` wins over the
//! configured level when both are set; JSON output is opt-in.

use crate::config::RuntimeConfig;
use crate::errors::RuntimeError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter for `config`.
pub fn env_filter(config: &RuntimeConfig) -> Result<EnvFilter, RuntimeError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| RuntimeError::Logging(e.to_string()))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &RuntimeConfig) -> Result<(), RuntimeError> {
    let env_filter = env_filter(config)?;

    let result = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|e| RuntimeError::Logging(e.to_string()))?;

    tracing::info!(
        node = %config.node_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

//! Tracing subscriber setup
//!
//! Logs always go to stderr; stdout carries only command output so it can
//! be piped into the next command.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{CptError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
fn default_filter_expression(level: &str) -> String {
    format!("warn,cpt={level}")
}

/// Install the global subscriber described by `config`
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter_expression(&config.level)))
        .map_err(|e| CptError::Config(format!("Invalid log level {}: {}", config.level, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let initialized = match config.format {
        LogFormat::Json => registry.with(layer.json()).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
    };

    initialized.map_err(|e| CptError::Config(format!("Failed to initialize logging: {}", e)))
}

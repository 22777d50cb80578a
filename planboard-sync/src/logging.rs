//! Tracing subscriber setup for hosts that do not install their own

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` wins over `config.log_level`. Fails if a global subscriber is
/// already set.
pub fn init_tracing(config: &SyncConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .map_err(|e| SyncError::config(format!("failed to install tracing subscriber: {e}")))
}

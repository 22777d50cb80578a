//! Engine configuration, loaded with Figment.
//!
//! Sources in precedence order (later sources override earlier ones):
//! 1. Default values
//! 2. An optional configuration file (TOML, YAML or JSON, by extension)
//! 3. Environment variables prefixed with `PLANBOARD_`

use crate::error::{Result, SyncError};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Prefix for environment overrides, e.g. `PLANBOARD_REMOTE_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "PLANBOARD_";

/// Default remote call timeout
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;

/// Default number of reorder records kept
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 100;

/// Default change notification buffer
pub const DEFAULT_CHANGE_BUFFER: usize = 256;

/// Tunables for the synchronization engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long to wait for the mutation channel before treating the remote
    /// as unreachable and rolling back
    pub remote_timeout_ms: u64,
    /// Check store invariants after every optimistic mutation
    pub verify_invariants: bool,
    /// Reorder records kept in the activity log
    pub activity_capacity: usize,
    /// Change notifications buffered per subscriber before lagging
    pub change_buffer: usize,
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
            verify_invariants: true,
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
            change_buffer: DEFAULT_CHANGE_BUFFER,
            log_level: "info".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load from defaults and environment variables
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment(None)?)
    }

    /// Load from defaults, a configuration file, and environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_figment(Self::figment(Some(path.as_ref()))?)
    }

    /// Build the figment with all sources in precedence order
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            debug!(path = %path.display(), "loading sync configuration file");
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => {
                    return Err(SyncError::config(format!(
                        "unsupported configuration format: {}",
                        path.display()
                    )))
                }
            };
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| SyncError::config(e.to_string()))?;
        config.validate()?;
        debug!(?config, "sync configuration loaded");
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.remote_timeout_ms == 0 {
            return Err(SyncError::config("remote_timeout_ms must be greater than 0"));
        }
        if self.change_buffer == 0 {
            return Err(SyncError::config("change_buffer must be greater than 0"));
        }
        if self.log_level.trim().is_empty() {
            return Err(SyncError::config("log_level must not be empty"));
        }
        Ok(())
    }

    /// Remote call timeout as a duration
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Set the remote call timeout
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the activity log capacity
    pub fn with_activity_capacity(mut self, capacity: usize) -> Self {
        self.activity_capacity = capacity;
        self
    }
}

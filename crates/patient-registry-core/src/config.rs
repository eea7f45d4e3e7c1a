//! Registry configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tag recorded as `registered_by` on every new patient.
pub const DEFAULT_REGISTERED_BY: &str = "medblocks";

/// How often list/table views reload.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "patient_registry_core=info";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Startup configuration, chosen once per process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Database file. `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
    /// Tag identifying the registering agent
    pub registered_by: String,
    /// View reload interval in milliseconds
    pub poll_interval_ms: u64,
    /// Drop and recreate the patients table on open. Destroys all rows.
    pub reset_on_open: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            registered_by: DEFAULT_REGISTERED_BY.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reset_on_open: false,
        }
    }
}

impl RegistryConfig {
    /// In-memory configuration (for testing).
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration with defaults for everything else.
    pub fn at_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            data_path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Parse from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.registered_by.trim().is_empty() {
            return Err(ConfigError::Invalid("registered_by must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

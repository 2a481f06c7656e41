//! Configuration management for Keygate.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/keygate/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session re-verification settings
    pub session: SessionConfig,
    /// Secret store settings
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `KEYGATE_CHECK_INTERVAL_SECS`: Override the re-verification interval
    /// - `KEYGATE_SERVICE_PREFIX`: Override the secret store service prefix
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        if let Ok(val) = std::env::var("KEYGATE_CHECK_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                config.session.check_interval_secs = secs;
                tracing::debug!("Override check_interval_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("KEYGATE_SERVICE_PREFIX") {
            if !val.is_empty() {
                tracing::debug!("Override store.service_prefix from env: {}", val);
                config.store.service_prefix = val;
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/keygate/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("app", "keygate", "keygate").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/keygate`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("app", "keygate", "keygate").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Session re-verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds between periodic proof-of-possession checks while
    /// authenticated (0 = periodic checks disabled)
    pub check_interval_secs: u64,
}

impl SessionConfig {
    /// The periodic check interval as a `Duration`, or `None` when disabled.
    #[must_use]
    pub fn check_interval(&self) -> Option<Duration> {
        if self.check_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.check_interval_secs))
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 10,
        }
    }
}

/// Secret store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix applied to every service name in the platform store,
    /// keeping Keygate entries namespaced away from other applications
    pub service_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            service_prefix: "keygate".to_string(),
        }
    }
}

//! Configuration for the diagnostics subsystem

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use swipe_diag_core::{BuildProfile, LogLevel};
use swipe_diag_storage::config::DEFAULT_LOG_DIR;
use swipe_diag_storage::{BackendKind, StorageConfig};

use crate::error::ConfigError;

/// Overrides the minimum level
pub const ENV_LEVEL: &str = "SWIPE_DIAG_LEVEL";
/// Overrides the storage directory
pub const ENV_DIR: &str = "SWIPE_DIAG_DIR";

/// Main diagnostics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Version string stamped on every entry
    pub app_version: String,

    /// Build classification, recorded in exports
    pub build: BuildProfile,

    /// Entries below this level are dropped (audit is always kept)
    pub min_level: LogLevel,

    /// Mirror entries to the developer console through `tracing`
    pub console_echo: bool,

    /// Storage backend settings
    pub storage: StorageConfig,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        match BuildProfile::current() {
            BuildProfile::Development => Self::development(),
            BuildProfile::Production => Self::production(DEFAULT_LOG_DIR),
        }
    }
}

impl DiagnosticsConfig {
    /// Create a config for development (everything logged and echoed)
    pub fn development() -> Self {
        Self {
            app_version: "0.0.0".to_string(),
            build: BuildProfile::Development,
            min_level: LogLevel::Debug,
            console_echo: true,
            storage: StorageConfig::default(),
        }
    }

    /// Create a config for production (info and above, no echo)
    pub fn production(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_version: "0.0.0".to_string(),
            build: BuildProfile::Production,
            min_level: LogLevel::Info,
            console_echo: false,
            storage: StorageConfig::with_data_dir(data_dir),
        }
    }

    /// Create a config for tests (everything logged, quiet console)
    pub fn testing(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_version: "0.0.0-test".to_string(),
            build: BuildProfile::Development,
            min_level: LogLevel::Debug,
            console_echo: false,
            storage: StorageConfig::with_data_dir(data_dir),
        }
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_console_echo(mut self, enabled: bool) -> Self {
        self.console_echo = enabled;
        self
    }

    /// Force a storage backend instead of choosing from the host
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.storage.backend = Some(backend);
        self
    }

    /// Apply `SWIPE_DIAG_LEVEL` and `SWIPE_DIAG_DIR` from the environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(level) = lookup(ENV_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.min_level = level.parse::<LogLevel>().map_err(|e| ConfigError::InvalidEnv {
                var: ENV_LEVEL,
                message: e.to_string(),
            })?;
        }

        if let Some(dir) = lookup(ENV_DIR).filter(|v| !v.trim().is_empty()) {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }

        Ok(self)
    }
}

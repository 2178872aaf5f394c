//! Plugin configuration.
//!
//! Read once at startup from `ormtype.json`. A missing or invalid required
//! key is a hard startup failure: analysis over a half-configured plugin
//! would silently resolve nothing, which is worse than refusing to start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file name, resolved against the project root.
pub const CONFIG_FILE: &str = "ormtype.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no plugin configuration at {path}: {source}")]
    Missing {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid plugin configuration at {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("plugin configuration at {path}: `{key}` must not be empty")]
    EmptyKey { path: String, key: &'static str },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Opaque settings-module identifier handed to the registry adapter.
    pub settings_module: String,
    /// Directory for the dependency report and other per-project scratch.
    pub scratch_path: PathBuf,
    /// Script invoked as a subprocess to dump the installed-app list; when
    /// unset the app list comes from the in-process registry.
    #[serde(default)]
    pub installed_apps_script: Option<PathBuf>,
    /// Treat registry problems at startup as fatal rather than degraded.
    #[serde(default = "default_strict_settings")]
    pub strict_settings: bool,
}

fn default_strict_settings() -> bool {
    true
}

impl PluginConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Missing {
            path: display.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Invalid {
            path: display.clone(),
            source,
        })?;
        config.validate(&display)?;
        Ok(config)
    }

    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        if self.settings_module.trim().is_empty() {
            return Err(ConfigError::EmptyKey {
                path: path.to_string(),
                key: "settings_module",
            });
        }
        if self.scratch_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyKey {
                path: path.to_string(),
                key: "scratch_path",
            });
        }
        Ok(())
    }

    /// The parsed configuration, for the host's cache-invalidation hook: a
    /// change in any of these values must invalidate prior analysis results.
    pub fn config_data_for_cache(&self) -> serde_json::Value {
        serde_json::json!({
            "settings_module": self.settings_module,
            "scratch_path": self.scratch_path,
            "installed_apps_script": self.installed_apps_script,
            "strict_settings": self.strict_settings,
        })
    }
}

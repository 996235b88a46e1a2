//! Updater configuration.
//!
//! The only configuration file is the user-wide `~/.selfup/config.toml`. Every
//! field is optional; a missing file or field falls back to the Poetry release
//! layout.
//!
//! # File Format
//!
//! ```toml
//! tool_name = "poetry"
//! home_env = "POETRY_HOME"
//! default_home = "~/.poetry"
//! release_base_url = "https://github.com/python-poetry/poetry/releases/download"
//! catalog_url = "https://pypi.org/pypi"
//! entry_module = "poetry.console"
//! request_timeout_secs = 300
//! ```
//!
//! The configuration is loaded once by the CLI and handed to the updater
//! components by value. No component reads the environment on its own.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration for the self-update pipeline.
///
/// # Examples
///
/// ```rust
/// use selfup_cli::config::UpdaterConfig;
///
/// let config: UpdaterConfig = toml::from_str(r#"tool_name = "mytool""#).unwrap();
/// assert_eq!(config.tool_name, "mytool");
/// assert_eq!(config.request_timeout_secs, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Name of the managed tool.
    ///
    /// Used for the launcher script name, the vendored dependency directory
    /// under `lib/`, the archive names, and the catalog project name.
    #[serde(default = "default_tool_name")]
    pub tool_name: String,

    /// Environment variable that overrides the installation home.
    #[serde(default = "default_home_env")]
    pub home_env: String,

    /// Installation home used when `home_env` is unset. `~` is expanded.
    #[serde(default = "default_home")]
    pub default_home: String,

    /// Base URL of the release downloads.
    ///
    /// Archives are fetched from `{release_base_url}/{version}/{archive}`.
    #[serde(default = "default_release_base_url")]
    pub release_base_url: String,

    /// Base URL of the PyPI-compatible JSON release catalog.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Python module whose `main()` the launcher invokes.
    #[serde(default = "default_entry_module")]
    pub entry_module: String,

    /// Per-request timeout for catalog and download requests, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_tool_name() -> String {
    "poetry".to_string()
}

fn default_home_env() -> String {
    "POETRY_HOME".to_string()
}

fn default_home() -> String {
    "~/.poetry".to_string()
}

fn default_release_base_url() -> String {
    "https://github.com/python-poetry/poetry/releases/download".to_string()
}

fn default_catalog_url() -> String {
    "https://pypi.org/pypi".to_string()
}

fn default_entry_module() -> String {
    "poetry.console".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            tool_name: default_tool_name(),
            home_env: default_home_env(),
            default_home: default_home(),
            release_base_url: default_release_base_url(),
            catalog_url: default_catalog_url(),
            entry_module: default_entry_module(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl UpdaterConfig {
    /// Default location of the configuration file (`~/.selfup/config.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = crate::utils::platform::get_home_dir()?;
        Ok(home.join(".selfup").join("config.toml"))
    }

    /// Load configuration from an optional path.
    ///
    /// Without a path the default location is used. A file that does not
    /// exist yields the default configuration.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match Self::default_path() {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!("No default config location ({e}), using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save configuration to a specific file path, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Request timeout as a [`Duration`](std::time::Duration).
    #[must_use]
    pub const fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_target_poetry_layout() {
        let config = UpdaterConfig::default();
        assert_eq!(config.tool_name, "poetry");
        assert_eq!(config.home_env, "POETRY_HOME");
        assert_eq!(config.default_home, "~/.poetry");
        assert_eq!(config.entry_module, "poetry.console");
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(300));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: UpdaterConfig =
            toml::from_str("catalog_url = \"http://localhost:9000/pypi\"\n").unwrap();
        assert_eq!(config.catalog_url, "http://localhost:9000/pypi");
        assert_eq!(config.release_base_url, default_release_base_url());
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config =
            UpdaterConfig::load_with_optional(Some(temp.path().join("missing.toml"))).await.unwrap();
        assert_eq!(config, UpdaterConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let config = UpdaterConfig {
            tool_name: "mytool".to_string(),
            request_timeout_secs: 5,
            ..UpdaterConfig::default()
        };

        config.save_to(&path).await.unwrap();
        let loaded = UpdaterConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();

        let err = UpdaterConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}

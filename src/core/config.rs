//! Configuration management for Slotdeck.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::plugin::STORE_FILE;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Registry persistence
    pub registry: RegistryConfig,

    /// Plugin loading
    pub loader: LoaderConfig,

    /// Settings validation
    pub settings: SettingsConfig,

    /// Slot rendering
    pub render: RenderConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for the registry store. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Registry persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Store file name, relative to the data directory
    pub store_file: String,
}

/// Plugin loading settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Fail loads that take longer than this. Unset waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_timeout_secs: Option<u64>,
}

/// Settings validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Reject out-of-range numbers and unlisted choices in the settings form
    pub enforce_bounds: bool,
}

/// Slot rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// How long `render` waits for pending plugins, in milliseconds
    pub wait_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { store_file: STORE_FILE.to_string() }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { wait_ms: 500 }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.slotdeck.toml` in current directory
    /// 2. `~/.config/slotdeck/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        // Try local config first
        let local_config = PathBuf::from(".slotdeck.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        // Try global config
        if let Some(global_config) = Self::config_dir().map(|d| d.join("config.toml")) {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        // Return defaults
        Ok(Self::default())
    }

    /// Load from `path` when given, otherwise from the default locations.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::APP_NAME))
    }

    /// Directory holding the registry store.
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.general.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(crate::APP_NAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory; set general.data_dir"))
    }

    /// Full path of the registry store file.
    pub fn registry_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.registry.store_file))
    }

    /// Configured load timeout.
    pub fn load_timeout(&self) -> Option<Duration> {
        self.loader.load_timeout_secs.map(Duration::from_secs)
    }

    /// How long to wait for pending plugins when rendering.
    pub fn render_wait(&self) -> Duration {
        Duration::from_millis(self.render.wait_ms)
    }
}

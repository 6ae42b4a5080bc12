//! Application wiring.
//!
//! The [`Shell`] owns the shared registry, loader and settings engine built
//! from a [`Config`], and exposes the operations the CLI runs.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::Config;
use crate::plugin::{
    catalog, JsonFileStore, LoaderTable, PluginDescriptor, PluginLoader, PluginRegistry, SlotHost,
};
use crate::settings::{SettingsForm, SettingsSchemaEngine};

/// Outcome of a lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The registry changed.
    Changed,
    /// The plugin was already in the requested state.
    Unchanged,
    /// The plugin is not in the registry.
    NotInstalled,
}

/// Running application state.
#[derive(Debug)]
pub struct Shell {
    config: Config,
    registry: Arc<PluginRegistry>,
    loader: Arc<PluginLoader>,
    engine: SettingsSchemaEngine,
}

impl Shell {
    /// Open the persistent registry described by `config`, restore it, and
    /// build a loader over the built-in plugins.
    pub async fn start(config: Config) -> Result<Self> {
        let path = config.registry_path()?;
        tracing::debug!(path = %path.display(), "Opening plugin registry");

        let store = Arc::new(JsonFileStore::new(path));
        let registry = PluginRegistry::with_store(store).context("Failed to open plugin registry")?;
        registry.hydrate().await;

        let loader = PluginLoader::new(LoaderTable::builtin())
            .context("Failed to create plugin loader")?
            .with_timeout(config.load_timeout());

        Ok(Self::from_parts(config, Arc::new(registry), Arc::new(loader)))
    }

    /// Assemble a shell from existing parts.
    pub fn from_parts(config: Config, registry: Arc<PluginRegistry>, loader: Arc<PluginLoader>) -> Self {
        let engine = SettingsSchemaEngine::new(config.settings.enforce_bounds);
        Self { config, registry, loader, engine }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Shared loader.
    pub fn loader(&self) -> &Arc<PluginLoader> {
        &self.loader
    }

    /// Install a catalog plugin.
    pub fn install(&self, id: &str) -> Result<Outcome> {
        let descriptor = catalog::lookup(id)?.clone();
        Ok(if self.registry.install(descriptor) { Outcome::Changed } else { Outcome::Unchanged })
    }

    /// Uninstall a plugin.
    pub fn uninstall(&self, id: &str) -> Outcome {
        self.lifecycle(id, PluginRegistry::uninstall)
    }

    /// Enable an installed plugin.
    pub fn enable(&self, id: &str) -> Outcome {
        self.lifecycle(id, PluginRegistry::enable)
    }

    /// Disable a plugin.
    pub fn disable(&self, id: &str) -> Outcome {
        self.lifecycle(id, PluginRegistry::disable)
    }

    fn lifecycle(&self, id: &str, action: fn(&PluginRegistry, &str) -> bool) -> Outcome {
        match self.registry.get(id) {
            None => Outcome::NotInstalled,
            Some(plugin) if !plugin.installed => Outcome::NotInstalled,
            Some(_) if action(&self.registry, id) => Outcome::Changed,
            Some(_) => Outcome::Unchanged,
        }
    }

    /// Settings form for a plugin in the registry.
    pub fn settings_form(&self, id: &str) -> Option<SettingsForm> {
        self.registry.get(id).map(|plugin| SettingsForm::for_plugin(&plugin, self.engine))
    }

    /// Store a form's staged edits. Returns whether anything changed.
    pub fn apply_form(&self, form: &mut SettingsForm) -> bool {
        let changes = form.take_changes();
        if changes.is_empty() {
            return false;
        }
        self.registry.update_settings(form.plugin_id(), changes)
    }

    /// Set one setting from raw text, validated against the plugin's schema.
    pub fn set_setting(&self, id: &str, key: &str, raw: &str) -> Result<bool> {
        let mut form = self
            .settings_form(id)
            .ok_or_else(|| anyhow::anyhow!("Plugin '{id}' is not installed"))?;
        form.set(key, raw).with_context(|| format!("Cannot set '{key}' on '{id}'"))?;
        Ok(self.apply_form(&mut form))
    }

    /// Clear a plugin's stored settings.
    pub fn reset_settings(&self, id: &str) -> Outcome {
        match self.registry.get(id) {
            None => Outcome::NotInstalled,
            Some(_) if self.registry.reset_settings(id) => Outcome::Changed,
            Some(_) => Outcome::Unchanged,
        }
    }

    /// Records shown by `list`.
    pub fn plugins(&self, enabled_only: bool) -> Vec<PluginDescriptor> {
        if enabled_only {
            self.registry.enabled_plugins()
        } else {
            self.registry.installed_plugins()
        }
    }

    /// Host for a named slot.
    pub fn slot(&self, name: &str) -> SlotHost {
        SlotHost::new(name, Arc::clone(&self.registry), Arc::clone(&self.loader))
    }

    /// Wait for pending registry writes.
    pub async fn shutdown(&self) {
        self.registry.flush().await;
    }
}

//! Slot host: renders the plugins that target a named slot.
//!
//! A [`SlotHost`] reads the registry's enabled plugins for its slot in
//! insertion order and asks the [`PluginLoader`] for each implementation.
//! Pending loads render a placeholder, failures render an inline error, and
//! nothing a plugin does can escape the slot.

use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use super::loader::panic_message;
use super::{LoadEvent, PluginDescriptor, PluginLoader, PluginRegistry, Resolution};
use crate::settings::SettingsSchemaEngine;

/// Render state of one plugin in a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Implementation still loading.
    Loading,
    /// Rendered output.
    Rendered(String),
    /// Inline, non-fatal error.
    Error(String),
}

/// One plugin's contribution to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    /// Plugin id.
    pub plugin_id: String,
    /// Plugin display name.
    pub plugin_name: String,
    /// Render state.
    pub state: EntryState,
}

/// Rendered contents of a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotView {
    /// No plugin targets the slot and no fallback was given.
    Empty,
    /// No plugin targets the slot; caller-supplied fallback.
    Fallback(String),
    /// One entry per eligible plugin, in registry order.
    Entries(Vec<SlotEntry>),
}

impl SlotView {
    /// Entries, empty for `Empty` and `Fallback`.
    pub fn entries(&self) -> &[SlotEntry] {
        match self {
            Self::Entries(entries) => entries,
            Self::Empty | Self::Fallback(_) => &[],
        }
    }

    /// Ids of the plugins shown, in order.
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.entries().iter().map(|e| e.plugin_id.as_str()).collect()
    }

    /// Whether no entry is still loading.
    pub fn is_settled(&self) -> bool {
        self.entries().iter().all(|e| e.state != EntryState::Loading)
    }
}

impl fmt::Display for SlotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Fallback(text) => writeln!(f, "{text}"),
            Self::Entries(entries) => {
                for entry in entries {
                    match &entry.state {
                        EntryState::Loading => writeln!(f, "[…] {} loading", entry.plugin_name)?,
                        EntryState::Rendered(output) => {
                            writeln!(f, "[{}]", entry.plugin_name)?;
                            for line in output.lines() {
                                writeln!(f, "  {line}")?;
                            }
                        }
                        EntryState::Error(reason) => {
                            writeln!(f, "[!] {}: {reason}", entry.plugin_name)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Why a slot host should re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    /// The registry changed.
    Registry,
    /// A plugin shown as loading in this slot finished loading.
    Loaded(String),
    /// Load notifications were missed; re-render to catch up.
    Resync,
    /// Change sources are gone.
    Closed,
}

/// Renders one named slot.
pub struct SlotHost {
    slot: String,
    fallback: Option<String>,
    registry: Arc<PluginRegistry>,
    loader: Arc<PluginLoader>,
    registry_rx: watch::Receiver<u64>,
    load_rx: broadcast::Receiver<LoadEvent>,
    awaiting: HashSet<String>,
}

impl fmt::Debug for SlotHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotHost")
            .field("slot", &self.slot)
            .field("fallback", &self.fallback)
            .field("awaiting", &self.awaiting)
            .finish()
    }
}

impl SlotHost {
    /// Create a host for `slot`.
    pub fn new(
        slot: impl Into<String>,
        registry: Arc<PluginRegistry>,
        loader: Arc<PluginLoader>,
    ) -> Self {
        let registry_rx = registry.subscribe();
        let load_rx = loader.subscribe();
        Self {
            slot: slot.into(),
            fallback: None,
            registry,
            loader,
            registry_rx,
            load_rx,
            awaiting: HashSet::new(),
        }
    }

    /// Show `text` when no plugin targets the slot.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Slot name.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Render the slot's current contents.
    pub fn render(&mut self) -> SlotView {
        self.registry_rx.borrow_and_update();
        self.awaiting.clear();

        let plugins = self.registry.plugins_for_slot(&self.slot);
        if plugins.is_empty() {
            return self.fallback.clone().map_or(SlotView::Empty, SlotView::Fallback);
        }

        let entries = plugins.into_iter().map(|plugin| self.render_entry(plugin)).collect();
        SlotView::Entries(entries)
    }

    fn render_entry(&mut self, plugin: PluginDescriptor) -> SlotEntry {
        let state = match self.loader.resolve(&plugin.id) {
            Resolution::Pending => {
                self.awaiting.insert(plugin.id.clone());
                EntryState::Loading
            }
            Resolution::Ready(implementation) => {
                let settings = SettingsSchemaEngine::effective_settings(
                    plugin.settings_schema.as_ref(),
                    &plugin.settings,
                );
                match std::panic::catch_unwind(AssertUnwindSafe(|| implementation.render(&settings))) {
                    Ok(output) => EntryState::Rendered(output),
                    Err(panic) => {
                        let reason = panic_message(panic.as_ref());
                        tracing::error!(slot = %self.slot, plugin = %plugin.id, reason = %reason, "Plugin panicked while rendering");
                        EntryState::Error(format!("crashed while rendering: {reason}"))
                    }
                }
            }
            Resolution::Failed(reason) => EntryState::Error(reason),
        };

        SlotEntry { plugin_id: plugin.id, plugin_name: plugin.name, state }
    }

    fn still_shown(&self, id: &str) -> bool {
        self.awaiting.contains(id)
            && self.registry.get(id).is_some_and(|p| p.is_active() && p.targets(&self.slot))
    }

    /// Wait until the slot needs re-rendering.
    ///
    /// Load results for plugins that are no longer eligible for this slot are
    /// discarded here, so a late load can never resurrect a removed entry.
    pub async fn changed(&mut self) -> SlotChange {
        loop {
            tokio::select! {
                result = self.registry_rx.changed() => {
                    return match result {
                        Ok(()) => SlotChange::Registry,
                        Err(_) => SlotChange::Closed,
                    };
                }
                event = self.load_rx.recv() => match event {
                    Ok(event) if self.still_shown(&event.id) => return SlotChange::Loaded(event.id),
                    Ok(event) => {
                        tracing::debug!(slot = %self.slot, plugin = %event.id, "Discarding load result not shown in this slot");
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(slot = %self.slot, missed, "Missed load notifications");
                        return SlotChange::Resync;
                    }
                    Err(broadcast::error::RecvError::Closed) => return SlotChange::Closed,
                },
            }
        }
    }

    /// Render, then keep re-rendering on changes until nothing is loading or
    /// `wait` has elapsed. Returns the last view.
    pub async fn settle(&mut self, wait: Duration) -> SlotView {
        let deadline = tokio::time::Instant::now() + wait;
        let mut view = self.render();

        while !view.is_settled() {
            match tokio::time::timeout_at(deadline, self.changed()).await {
                Ok(SlotChange::Closed) | Err(_) => break,
                Ok(_) => view = self.render(),
            }
        }

        view
    }
}

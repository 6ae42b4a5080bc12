//! Plugin registry: the authoritative list of plugins and their lifecycle.
//!
//! Every mutation is a [`RegistryAction`] applied to a [`RegistryState`] by a
//! pure transition function. [`PluginRegistry`] owns the state behind a lock,
//! and observes successful transitions to bump a revision counter (which slot
//! hosts watch) and to hand a snapshot to the persistence worker.
//!
//! Mutations never fail: an unknown id is a no-op, so a double click or a
//! stale UI action cannot take the host down.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot, watch};

use super::{PluginDescriptor, PluginError, PluginResult, RegistryStore, SLOTS_KEY};

/// A registry mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryAction {
    /// Insert or replace a plugin and mark it installed.
    Install(PluginDescriptor),
    /// Soft-delete: clear `installed` and `enabled`, keep the record.
    Uninstall(String),
    /// Enable an installed plugin.
    Enable(String),
    /// Disable a plugin.
    Disable(String),
    /// Shallow-merge overrides into the stored settings.
    UpdateSettings { id: String, partial: Map<String, Value> },
    /// Drop every stored override except slot placement.
    ResetSettings(String),
}

impl RegistryAction {
    /// Action name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Uninstall(_) => "uninstall",
            Self::Enable(_) => "enable",
            Self::Disable(_) => "disable",
            Self::UpdateSettings { .. } => "update_settings",
            Self::ResetSettings(_) => "reset_settings",
        }
    }

    /// Plugin id the action targets.
    pub fn plugin_id(&self) -> &str {
        match self {
            Self::Install(d) => &d.id,
            Self::Uninstall(id)
            | Self::Enable(id)
            | Self::Disable(id)
            | Self::ResetSettings(id)
            | Self::UpdateSettings { id, .. } => id,
        }
    }
}

/// Plugin records in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryState {
    plugins: Vec<PluginDescriptor>,
}

impl RegistryState {
    /// All records in insertion order.
    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    /// Record for `id`.
    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut PluginDescriptor> {
        self.plugins.iter_mut().find(|p| p.id == id)
    }

    /// Apply an action. Returns whether anything changed.
    pub fn apply(&mut self, action: RegistryAction) -> bool {
        match action {
            RegistryAction::Install(descriptor) => self.install(descriptor),
            RegistryAction::Uninstall(id) => self.get_mut(&id).is_some_and(|p| {
                let changed = p.installed || p.enabled;
                p.installed = false;
                p.enabled = false;
                changed
            }),
            RegistryAction::Enable(id) => self.get_mut(&id).is_some_and(|p| {
                let changed = p.installed && !p.enabled;
                p.enabled |= p.installed;
                changed
            }),
            RegistryAction::Disable(id) => self.get_mut(&id).is_some_and(|p| {
                let changed = p.enabled;
                p.enabled = false;
                changed
            }),
            RegistryAction::UpdateSettings { id, partial } => {
                self.get_mut(&id).is_some_and(|p| {
                    let mut changed = false;
                    for (key, value) in partial {
                        if p.settings.get(&key) != Some(&value) {
                            p.settings.insert(key, value);
                            changed = true;
                        }
                    }
                    changed
                })
            }
            RegistryAction::ResetSettings(id) => self.get_mut(&id).is_some_and(|p| {
                let mut kept = Map::new();
                if let Some(slots) = p.settings.remove(SLOTS_KEY) {
                    kept.insert(SLOTS_KEY.to_string(), slots);
                }
                let changed = !p.settings.is_empty();
                p.settings = kept;
                changed
            }),
        }
    }

    /// Replace the record's metadata, keep its stored settings, force
    /// `installed`. `enabled` comes from the incoming descriptor.
    fn install(&mut self, mut incoming: PluginDescriptor) -> bool {
        incoming.installed = true;

        match self.get_mut(&incoming.id) {
            Some(existing) => {
                let mut settings = std::mem::take(&mut incoming.settings);
                for (key, value) in &existing.settings {
                    settings.insert(key.clone(), value.clone());
                }
                incoming.settings = settings;

                if *existing == incoming {
                    false
                } else {
                    *existing = incoming;
                    true
                }
            }
            None => {
                self.plugins.push(incoming);
                true
            }
        }
    }

    /// Fold stored records under the current ones. Records already present
    /// in memory win, but keep any stored settings they do not override;
    /// duplicate stored ids keep their first occurrence.
    /// Returns how many records were added.
    fn merge_stored(&mut self, stored: Vec<PluginDescriptor>) -> usize {
        let mut seen = HashSet::new();
        let mut added = 0;
        for mut record in stored {
            if !seen.insert(record.id.clone()) {
                tracing::debug!(plugin = %record.id, "Skipping duplicate stored record");
                continue;
            }
            if let Some(current) = self.get_mut(&record.id) {
                tracing::debug!(plugin = %record.id, "Stored record shadowed by a newer one; keeping its settings");
                for (key, value) in std::mem::take(&mut record.settings) {
                    current.settings.entry(key).or_insert(value);
                }
                continue;
            }
            if record.enabled && !record.installed {
                tracing::warn!(plugin = %record.id, "Stored record enabled but not installed; disabling");
                record.enabled = false;
            }
            self.plugins.push(record);
            added += 1;
        }
        added
    }
}

enum PersistCommand {
    Save(Vec<PluginDescriptor>),
    Flush(oneshot::Sender<()>),
}

struct Inner {
    state: RegistryState,
    /// Whether hydration has finished; saves are held back until then so a
    /// pre-hydration write cannot clobber the stored registry.
    hydrated: bool,
    /// A change happened before hydration finished.
    dirty: bool,
}

/// The shared plugin registry.
pub struct PluginRegistry {
    inner: RwLock<Inner>,
    revision: watch::Sender<u64>,
    store: Option<Arc<dyn RegistryStore>>,
    persist_tx: Option<mpsc::UnboundedSender<PersistCommand>>,
    hydration_started: AtomicBool,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("PluginRegistry")
            .field("plugins", &inner.state.plugins.len())
            .field("hydrated", &inner.hydrated)
            .field("revision", &*self.revision.borrow())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PluginRegistry {
    /// Create a registry with no persistence. Needs no async runtime.
    pub fn in_memory() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: RwLock::new(Inner { state: RegistryState::default(), hydrated: true, dirty: false }),
            revision,
            store: None,
            persist_tx: None,
            hydration_started: AtomicBool::new(true),
        }
    }

    /// Create a registry persisted to `store`.
    ///
    /// Spawns the persistence worker on the current tokio runtime. Call
    /// [`hydrate`](Self::hydrate) once at startup; writes are held back until
    /// hydration has run.
    pub fn with_store(store: Arc<dyn RegistryStore>) -> PluginResult<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| PluginError::NoRuntime(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(persist_worker(Arc::clone(&store), rx));

        let (revision, _) = watch::channel(0);
        Ok(Self {
            inner: RwLock::new(Inner { state: RegistryState::default(), hydrated: false, dirty: false }),
            revision,
            store: Some(store),
            persist_tx: Some(tx),
            hydration_started: AtomicBool::new(false),
        })
    }

    /// Load stored records. Runs at most once; later calls return 0.
    ///
    /// A missing, unreadable or unparsable store is treated as a first run.
    /// Returns the number of records restored.
    pub async fn hydrate(&self) -> usize {
        if self.hydration_started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Plugin registry already hydrated");
            return 0;
        }

        let stored = match &self.store {
            Some(store) => match store.load().await {
                Ok(Some(records)) => records,
                Ok(None) => {
                    tracing::info!("No stored plugin registry; starting empty");
                    Vec::new()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read plugin registry; starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let added = {
            let mut inner = self.inner.write();
            let added = inner.state.merge_stored(stored);
            inner.hydrated = true;
            if std::mem::take(&mut inner.dirty) {
                self.send_snapshot(&inner.state);
            }
            added
        };

        self.revision.send_modify(|r| *r += 1);
        tracing::info!(count = added, "Hydrated plugin registry");
        added
    }

    /// Whether hydration has completed.
    pub fn is_hydrated(&self) -> bool {
        self.inner.read().hydrated
    }

    /// Apply an action. Returns whether anything changed.
    pub fn dispatch(&self, action: RegistryAction) -> bool {
        let name = action.name();
        let id = action.plugin_id().to_string();

        {
            let mut inner = self.inner.write();
            if !inner.state.apply(action) {
                tracing::trace!(action = name, plugin = %id, "Registry action changed nothing");
                return false;
            }
            if inner.hydrated {
                self.send_snapshot(&inner.state);
            } else {
                inner.dirty = true;
            }
        }

        self.revision.send_modify(|r| *r += 1);
        tracing::debug!(action = name, plugin = %id, "Registry updated");
        true
    }

    fn send_snapshot(&self, state: &RegistryState) {
        if let Some(tx) = &self.persist_tx {
            if tx.send(PersistCommand::Save(state.plugins.clone())).is_err() {
                tracing::warn!("Registry persistence worker has stopped");
            }
        }
    }

    /// Install or reinstall a plugin.
    pub fn install(&self, descriptor: PluginDescriptor) -> bool {
        self.dispatch(RegistryAction::Install(descriptor))
    }

    /// Uninstall a plugin, keeping its record and settings.
    pub fn uninstall(&self, id: &str) -> bool {
        self.dispatch(RegistryAction::Uninstall(id.to_string()))
    }

    /// Enable an installed plugin.
    pub fn enable(&self, id: &str) -> bool {
        self.dispatch(RegistryAction::Enable(id.to_string()))
    }

    /// Disable a plugin.
    pub fn disable(&self, id: &str) -> bool {
        self.dispatch(RegistryAction::Disable(id.to_string()))
    }

    /// Shallow-merge `partial` into a plugin's stored settings.
    pub fn update_settings(&self, id: &str, partial: Map<String, Value>) -> bool {
        self.dispatch(RegistryAction::UpdateSettings { id: id.to_string(), partial })
    }

    /// Clear a plugin's stored overrides so every field reads its default.
    pub fn reset_settings(&self, id: &str) -> bool {
        self.dispatch(RegistryAction::ResetSettings(id.to_string()))
    }

    /// Stored overrides for a plugin; empty for an unknown id.
    pub fn get_settings(&self, id: &str) -> Map<String, Value> {
        self.inner.read().state.get(id).map(|p| p.settings.clone()).unwrap_or_default()
    }

    /// Record for `id`.
    pub fn get(&self, id: &str) -> Option<PluginDescriptor> {
        self.inner.read().state.get(id).cloned()
    }

    /// Every record, installed or not.
    pub fn all(&self) -> Vec<PluginDescriptor> {
        self.inner.read().state.plugins.clone()
    }

    /// Installed records in insertion order.
    pub fn installed_plugins(&self) -> Vec<PluginDescriptor> {
        self.filtered(|p| p.installed)
    }

    /// Enabled and installed records in insertion order.
    pub fn enabled_plugins(&self) -> Vec<PluginDescriptor> {
        self.filtered(PluginDescriptor::is_active)
    }

    /// Enabled records that render into `slot`, in insertion order.
    pub fn plugins_for_slot(&self, slot: &str) -> Vec<PluginDescriptor> {
        self.filtered(|p| p.is_active() && p.targets(slot))
    }

    fn filtered(&self, keep: impl Fn(&PluginDescriptor) -> bool) -> Vec<PluginDescriptor> {
        self.inner.read().state.plugins.iter().filter(|&p| keep(p)).cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.read().state.plugins.len()
    }

    /// Whether the registry has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current revision. Increments on every change.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Watch the revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Wait until every snapshot queued so far has been written.
    pub async fn flush(&self) {
        let Some(tx) = &self.persist_tx else { return };
        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(PersistCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn persist_worker(
    store: Arc<dyn RegistryStore>,
    mut rx: mpsc::UnboundedReceiver<PersistCommand>,
) {
    while let Some(command) = rx.recv().await {
        let mut latest = None;
        let mut waiters = Vec::new();
        absorb(command, &mut latest, &mut waiters);

        // Coalesce: only the newest queued snapshot needs writing.
        while let Ok(command) = rx.try_recv() {
            absorb(command, &mut latest, &mut waiters);
        }

        if let Some(snapshot) = latest {
            if let Err(e) = store.save(&snapshot).await {
                tracing::warn!(error = %e, "Failed to persist plugin registry");
            }
        }

        for waiter in waiters {
            let _ = waiter.send(());
        }
    }
}

fn absorb(
    command: PersistCommand,
    latest: &mut Option<Vec<PluginDescriptor>>,
    waiters: &mut Vec<oneshot::Sender<()>>,
) {
    match command {
        PersistCommand::Save(snapshot) => *latest = Some(snapshot),
        PersistCommand::Flush(waiter) => waiters.push(waiter),
    }
}

//! Plugin loader: maps plugin ids to lazily loaded implementations.
//!
//! The set of loadable ids is closed. A [`LoaderTable`] is assembled once and
//! frozen inside the [`PluginLoader`]; ids outside it resolve to a failure
//! straight away. Each id is loaded at most once per loader and the outcome,
//! success or failure, is cached for every slot host that asks.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use super::{PluginError, PluginResult};
use crate::settings::EffectiveSettings;

/// A renderable plugin implementation.
pub trait SlotPlugin: Send + Sync {
    /// Id this implementation is registered under.
    fn id(&self) -> &str;

    /// Render with the plugin's effective settings.
    fn render(&self, settings: &EffectiveSettings) -> String;
}

/// Future produced by a loader factory.
pub type LoadFuture = BoxFuture<'static, PluginResult<Arc<dyn SlotPlugin>>>;

type Factory = Arc<dyn Fn() -> LoadFuture + Send + Sync>;

/// Closed mapping from plugin id to a lazy factory.
#[derive(Clone, Default)]
pub struct LoaderTable {
    entries: HashMap<String, Factory>,
}

impl std::fmt::Debug for LoaderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderTable").field("ids", &self.ids()).finish()
    }
}

impl LoaderTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `id`, replacing any earlier one.
    pub fn register<F, Fut>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PluginResult<Arc<dyn SlotPlugin>>> + Send + 'static,
    {
        self.entries.insert(id.into(), Arc::new(move || factory().boxed()));
        self
    }

    /// Whether `id` has a factory.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current state of an id's implementation.
#[derive(Clone)]
pub enum Resolution {
    /// Load in progress.
    Pending,
    /// Implementation available.
    Ready(Arc<dyn SlotPlugin>),
    /// Load failed or id unknown.
    Failed(String),
}

impl Resolution {
    /// Whether the load is still running.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Ready(plugin) => f.debug_tuple("Ready").field(&plugin.id()).finish(),
            Self::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

/// Published when a load finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    /// Id that finished loading.
    pub id: String,
    /// Whether it loaded successfully.
    pub ok: bool,
}

/// Resolves plugin ids to implementations, loading each at most once.
pub struct PluginLoader {
    table: LoaderTable,
    cache: Arc<Mutex<HashMap<String, Resolution>>>,
    events: broadcast::Sender<LoadEvent>,
    runtime: Handle,
    timeout: Option<Duration>,
    loads_started: AtomicUsize,
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("table", &self.table)
            .field("cached", &self.cache.lock().len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PluginLoader {
    /// Create a loader over `table`, spawning loads on the current runtime.
    pub fn new(table: LoaderTable) -> PluginResult<Self> {
        let runtime = Handle::try_current().map_err(|e| PluginError::NoRuntime(e.to_string()))?;
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            table,
            cache: Arc::new(Mutex::new(HashMap::new())),
            events,
            runtime,
            timeout: None,
            loads_started: AtomicUsize::new(0),
        })
    }

    /// Fail loads that take longer than `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `id` is in the loader table.
    pub fn is_known(&self, id: &str) -> bool {
        self.table.contains(id)
    }

    /// Ids in the loader table, sorted.
    pub fn known_ids(&self) -> Vec<&str> {
        self.table.ids()
    }

    /// Number of asynchronous loads started so far.
    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::SeqCst)
    }

    /// Subscribe to load completions.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.events.subscribe()
    }

    /// Cached state for `id`, without starting a load.
    pub fn peek(&self, id: &str) -> Option<Resolution> {
        self.cache.lock().get(id).cloned()
    }

    /// Resolve `id`.
    ///
    /// Unknown ids fail immediately. The first request for a known id starts
    /// its load and returns `Pending`; every later request returns the cached
    /// state.
    pub fn resolve(&self, id: &str) -> Resolution {
        let Some(factory) = self.table.entries.get(id) else {
            return Resolution::Failed(PluginError::UnknownPlugin(id.to_string()).to_string());
        };

        {
            let mut cache = self.cache.lock();
            if let Some(state) = cache.get(id) {
                return state.clone();
            }
            cache.insert(id.to_string(), Resolution::Pending);
        }

        self.loads_started.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(plugin = id, "Loading plugin implementation");

        let factory = Arc::clone(factory);
        let cache = Arc::clone(&self.cache);
        let events = self.events.clone();
        let timeout = self.timeout;
        let id = id.to_string();

        self.runtime.spawn(async move {
            let load = AssertUnwindSafe(async move { factory().await }).catch_unwind();

            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, load).await {
                    Ok(outcome) => outcome,
                    Err(_) => Ok(Err(PluginError::Timeout(id.clone(), limit))),
                },
                None => load.await,
            };

            let resolution = match outcome {
                Ok(Ok(plugin)) => {
                    tracing::info!(plugin = %id, "Plugin implementation ready");
                    Resolution::Ready(plugin)
                }
                Ok(Err(e)) => {
                    tracing::warn!(plugin = %id, error = %e, "Plugin failed to load");
                    Resolution::Failed(e.to_string())
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    tracing::error!(plugin = %id, reason = %reason, "Plugin panicked while loading");
                    Resolution::Failed(format!("plugin panicked while loading: {reason}"))
                }
            };

            let ok = matches!(resolution, Resolution::Ready(_));
            cache.lock().insert(id.clone(), resolution);
            let _ = events.send(LoadEvent { id, ok });
        });

        Resolution::Pending
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Registry persistence.
//!
//! The whole registry is written as one JSON document after every change and
//! read once at startup:
//!
//! ```json
//! { "version": 1, "plugins": [ { "id": "clock", "name": "Clock", ... } ] }
//! ```
//!
//! A bare array of descriptors (the unversioned layout) is accepted on read.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{PluginDescriptor, PluginError, PluginResult, STORE_VERSION};

/// Storage backend for the plugin registry.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read all records. `Ok(None)` means nothing was ever stored.
    async fn load(&self) -> PluginResult<Option<Vec<PluginDescriptor>>>;

    /// Replace the stored records with `plugins`.
    async fn save(&self, plugins: &[PluginDescriptor]) -> PluginResult<()>;
}

#[derive(Debug, Serialize)]
struct StoreFileRef<'a> {
    version: u32,
    plugins: &'a [PluginDescriptor],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoreFile {
    Versioned { version: u32, plugins: Vec<PluginDescriptor> },
    Legacy(Vec<PluginDescriptor>),
}

/// Parse a stored registry document.
pub fn decode(content: &str) -> PluginResult<Vec<PluginDescriptor>> {
    match serde_json::from_str::<StoreFile>(content)? {
        StoreFile::Versioned { version, .. } if version > STORE_VERSION => {
            Err(PluginError::UnsupportedStoreVersion { found: version, supported: STORE_VERSION })
        }
        StoreFile::Versioned { plugins, .. } | StoreFile::Legacy(plugins) => Ok(plugins),
    }
}

/// Serialize records into the current store layout.
pub fn encode(plugins: &[PluginDescriptor]) -> PluginResult<String> {
    Ok(serde_json::to_string_pretty(&StoreFileRef { version: STORE_VERSION, plugins })?)
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by `path`. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PluginError {
        PluginError::Store { path: self.path.clone(), source }
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn load(&self) -> PluginResult<Option<Vec<PluginDescriptor>>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        decode(&content).map(Some)
    }

    async fn save(&self, plugins: &[PluginDescriptor]) -> PluginResult<()> {
        let content = encode(plugins)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }

        // Write to a sibling temp file and rename so readers never see a torn file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), count = plugins.len(), "Saved plugin registry");
        Ok(())
    }
}

/// In-process store, for embedding hosts that do not persist and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Option<Vec<PluginDescriptor>>>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with records.
    pub fn with_records(records: Vec<PluginDescriptor>) -> Self {
        Self { records: Mutex::new(Some(records)), ..Self::default() }
    }

    /// Currently stored records.
    pub fn records(&self) -> Option<Vec<PluginDescriptor>> {
        self.records.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn load(&self) -> PluginResult<Option<Vec<PluginDescriptor>>> {
        Ok(self.records.lock().clone())
    }

    async fn save(&self, plugins: &[PluginDescriptor]) -> PluginResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PluginError::Store {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("writes disabled"),
            });
        }
        *self.records.lock() = Some(plugins.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

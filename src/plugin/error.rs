//! Plugin system error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur during plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No implementation is registered for this id.
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    /// The catalog has no entry with this id.
    #[error("Plugin '{0}' is not in the catalog")]
    NotInCatalog(String),

    /// Plugin implementation failed to load.
    #[error("Failed to load plugin '{id}': {reason}")]
    LoadError { id: String, reason: String },

    /// Plugin load timed out.
    #[error("Plugin '{0}' timed out after {1:?}")]
    Timeout(String, Duration),

    /// Async work was requested outside a tokio runtime.
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    /// Registry store I/O failed.
    #[error("Store error at {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored registry was written by a newer version.
    #[error("Unsupported registry store version {found} (supported up to {supported})")]
    UnsupportedStoreVersion { found: u32, supported: u32 },
}

impl PluginError {
    /// Build a load error from anything displayable.
    pub fn load(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::LoadError { id: id.into(), reason: reason.to_string() }
    }
}

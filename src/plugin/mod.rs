//! Plugin system for Slotdeck.
//!
//! Plugins are installed from a static [`catalog`] into a persistent
//! [`PluginRegistry`], loaded lazily by a [`PluginLoader`] and rendered into
//! named slots by a [`SlotHost`].
//!
//! # Architecture
//!
//! - **Registry**: lifecycle state (installed, enabled, settings) behind pure
//!   transitions, persisted as a single JSON document.
//! - **Loader**: a closed id-to-factory table. Each implementation is loaded
//!   at most once and the outcome is shared.
//! - **Slot host**: renders the enabled plugins that target a slot, isolating
//!   load and render failures to inline error entries.
//!
//! # Slots
//!
//! A plugin lists its slots under the reserved `slots` settings key:
//!
//! ```json
//! { "slots": ["dashboard", "sidebar"] }
//! ```
//!
//! Plugins that declare none render into the `default` slot.

mod builtin;
pub mod catalog;
mod error;
mod loader;
mod registry;
mod slot;
mod store;
mod types;

pub use builtin::{Clock, DailyGoals, Greeting, Pomodoro, QuickNotes};
pub use error::{PluginError, PluginResult};
pub use loader::{LoadEvent, LoadFuture, LoaderTable, PluginLoader, Resolution, SlotPlugin};
pub use registry::{PluginRegistry, RegistryAction, RegistryState};
pub use slot::{EntryState, SlotChange, SlotEntry, SlotHost, SlotView};
pub use store::{decode, encode, JsonFileStore, MemoryStore, RegistryStore};
pub use types::{
    PluginCategory, PluginDescriptor, DEFAULT_SLOT, SLOTS_KEY, STORE_FILE, STORE_VERSION,
};

//! # Slotdeck
//!
//! Plugin host for terminal dashboards: install plugins from a catalog,
//! configure them through their settings schema, and render them into
//! named slots.
//!
//! ## Features
//!
//! - **Lifecycle registry**: install, enable, disable and configure plugins,
//!   persisted to a single JSON file
//! - **Lazy loading**: each plugin implementation loads once and is shared by
//!   every slot that shows it
//! - **Failure isolation**: a plugin that fails to load or panics shows an
//!   inline error instead of taking the host down
//! - **Schema-driven settings**: typed defaults, nested groups and editor hints
//!
//! ## Quick Start
//!
//! ```bash
//! slotdeck catalog
//! slotdeck install daily-goals
//! slotdeck settings set daily-goals dailyGoals.steps 12000
//! slotdeck render dashboard
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::future_not_send)]
#![allow(clippy::float_cmp)]

pub mod app;
pub mod core;
pub mod plugin;
pub mod settings;

// Re-export commonly used types
pub use app::Shell;
pub use core::Config;
pub use plugin::{
    PluginDescriptor, PluginError, PluginLoader, PluginRegistry, PluginResult, SlotHost, SlotView,
};
pub use settings::{SettingsError, SettingsForm, SettingsSchemaEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "slotdeck";

//! Core types shared by the library and the binary.
//!
//! Currently this is the configuration layer.

mod config;

pub use config::{Config, GeneralConfig, LoaderConfig, RegistryConfig, RenderConfig, SettingsConfig};

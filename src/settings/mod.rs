//! Schema-driven plugin settings.
//!
//! Plugins describe their configurable fields with a [`Schema`]. The
//! [`SettingsSchemaEngine`] expands that schema into flat, dotted-key fields,
//! resolves stored overrides against schema defaults, and validates edits.
//! [`SettingsForm`] is the editable view a settings UI is built from.
//!
//! Stored overrides are a flat map keyed by dotted path, so nested schema
//! groups never require a deep merge:
//!
//! ```text
//! dailyGoals.steps = 12000
//! units            = "imperial"
//! ```

mod engine;
mod error;
mod form;
mod schema;

pub use engine::{EffectiveSettings, FieldDescriptor, FieldKind, SettingsSchemaEngine};
pub use error::{SettingsError, SettingsResult};
pub use form::{FormField, SettingsForm};
pub use schema::{Properties, Schema};

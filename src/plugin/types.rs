//! Core plugin types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::settings::Schema;

/// Slot used by plugins that declare no slots.
pub const DEFAULT_SLOT: &str = "default";

/// Settings key holding a plugin's slot list.
pub const SLOTS_KEY: &str = "slots";

/// Version written into the registry store.
pub const STORE_VERSION: u32 = 1;

/// Default registry store file name.
pub const STORE_FILE: &str = "plugins.json";

/// Category of a plugin, for display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginCategory {
    /// Dashboards and status widgets.
    Widget,
    /// Personal productivity helpers.
    Productivity,
    /// Health and habit tracking.
    Health,
    /// Anything else.
    #[default]
    #[serde(other)]
    Other,
}

impl PluginCategory {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Widget => "Widget",
            Self::Productivity => "Productivity",
            Self::Health => "Health",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for PluginCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "widget" => Ok(Self::Widget),
            "productivity" => Ok(Self::Productivity),
            "health" => Ok(Self::Health),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown category '{s}' (expected widget, productivity, health or other)")),
        }
    }
}

/// An installable unit of functionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// Stable unique id; registry key and loader lookup key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Plugin author.
    #[serde(default)]
    pub author: String,
    /// Plugin version.
    #[serde(default)]
    pub version: String,
    /// Plugin description.
    #[serde(default)]
    pub description: String,
    /// Display icon.
    #[serde(default)]
    pub icon: String,
    /// Display category.
    #[serde(default)]
    pub category: PluginCategory,
    /// Declared capability tags. Advisory only.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Whether the plugin is installed.
    #[serde(default)]
    pub installed: bool,
    /// Whether the plugin is enabled. Implies `installed`.
    #[serde(default)]
    pub enabled: bool,
    /// Configurable fields.
    #[serde(default, deserialize_with = "lenient_schema", skip_serializing_if = "Option::is_none")]
    pub settings_schema: Option<Schema>,
    /// Stored overrides keyed by dotted path, plus the `slots` metadata array.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl PluginDescriptor {
    /// Create a bare descriptor.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author: String::new(),
            version: String::new(),
            description: String::new(),
            icon: String::new(),
            category: PluginCategory::Other,
            permissions: Vec::new(),
            installed: false,
            enabled: false,
            settings_schema: None,
            settings: Map::new(),
        }
    }

    /// Set the settings schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.settings_schema = Some(schema);
        self
    }

    /// Declare the slots this plugin renders into.
    pub fn with_slots<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = slots.into_iter().map(|s| Value::String(s.into())).collect();
        self.settings.insert(SLOTS_KEY.to_string(), Value::Array(slots));
        self
    }

    /// Slots this plugin targets. Falls back to the default slot when none
    /// are declared or the declaration is not a list of strings.
    pub fn slots(&self) -> Vec<String> {
        let declared: Option<Vec<String>> = self
            .settings
            .get(SLOTS_KEY)
            .and_then(Value::as_array)
            .and_then(|items| items.iter().map(|v| v.as_str().map(str::to_string)).collect());

        match declared {
            Some(slots) if !slots.is_empty() => slots,
            _ => vec![DEFAULT_SLOT.to_string()],
        }
    }

    /// Whether this plugin renders into `slot`.
    pub fn targets(&self, slot: &str) -> bool {
        self.slots().iter().any(|s| s == slot)
    }

    /// Whether the plugin is live: enabled and installed.
    pub fn is_active(&self) -> bool {
        self.enabled && self.installed
    }

    /// One-word lifecycle status.
    pub fn status(&self) -> &'static str {
        match (self.installed, self.enabled) {
            (true, true) => "enabled",
            (true, false) => "disabled",
            (false, _) => "uninstalled",
        }
    }
}

/// Accept any schema value; a schema that does not parse becomes `None` so a
/// single bad record cannot fail a whole registry load.
fn lenient_schema<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Schema>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value(value) {
        Ok(schema) => Some(schema),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed settings schema");
            None
        }
    }))
}

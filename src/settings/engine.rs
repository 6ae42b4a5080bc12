//! Schema interpretation: field expansion, effective values, validation.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Schema, SettingsError, SettingsResult};

/// Editor a settings UI should present for a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "editor", rename_all = "lowercase")]
pub enum FieldKind {
    /// Boolean switch.
    Toggle,
    /// Numeric input with optional bounds.
    Number { minimum: Option<f64>, maximum: Option<f64> },
    /// Closed choice among the listed options.
    Choice { options: Vec<String> },
    /// Freeform text.
    Text { multiline: bool },
}

impl FieldKind {
    /// Short label used in text listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Number { .. } => "number",
            Self::Choice { .. } => "choice",
            Self::Text { multiline: true } => "textarea",
            Self::Text { multiline: false } => "text",
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::Toggle => "a boolean",
            Self::Number { .. } => "a number",
            Self::Choice { .. } | Self::Text { .. } => "a string",
        }
    }
}

/// A flattened leaf of a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Dotted storage key.
    pub key: String,
    /// Human-readable label (falls back to the key).
    pub title: String,
    /// Editor kind.
    pub kind: FieldKind,
    /// Schema default.
    pub default: Value,
}

impl FieldDescriptor {
    fn from_leaf(key: String, node: &Schema) -> Option<Self> {
        let kind = match node {
            Schema::Boolean { .. } => FieldKind::Toggle,
            Schema::Number { minimum, maximum, .. } => {
                FieldKind::Number { minimum: *minimum, maximum: *maximum }
            }
            Schema::String { choices: Some(options), .. } => {
                FieldKind::Choice { options: options.clone() }
            }
            Schema::String { multiline, .. } => FieldKind::Text { multiline: *multiline },
            Schema::Object { .. } => return None,
        };

        let title = match node.title() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => key.clone(),
        };

        Some(Self { key, title, kind, default: node.default_value()? })
    }

    /// Whether `value` has the JSON type this field stores.
    pub fn accepts(&self, value: &Value) -> bool {
        match self.kind {
            FieldKind::Toggle => value.is_boolean(),
            FieldKind::Number { .. } => value.is_number(),
            FieldKind::Choice { .. } | FieldKind::Text { .. } => value.is_string(),
        }
    }
}

/// Resolved settings handed to a renderable.
///
/// Every schema leaf is present, holding either the stored override or the
/// default. Stored keys outside the schema (such as `slots`) pass through.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EffectiveSettings(Map<String, Value>);

impl EffectiveSettings {
    /// Raw value for a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Boolean value, if the key holds one.
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Numeric value, if the key holds one.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// String value, if the key holds one.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for EffectiveSettings {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Interprets settings schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsSchemaEngine {
    enforce_bounds: bool,
}

impl SettingsSchemaEngine {
    /// Create an engine. With `enforce_bounds`, validation also checks
    /// `minimum`/`maximum` and `enum` membership.
    pub fn new(enforce_bounds: bool) -> Self {
        Self { enforce_bounds }
    }

    /// Whether bounds and choices are enforced on validation.
    pub fn enforces_bounds(&self) -> bool {
        self.enforce_bounds
    }

    /// The effective value of a leaf: the stored value when it has a
    /// compatible type, otherwise the schema default. Objects yield `None`.
    pub fn effective_value(node: &Schema, stored: Option<&Value>) -> Option<Value> {
        match stored {
            Some(value) if node.accepts(value) => Some(value.clone()),
            _ => node.default_value(),
        }
    }

    /// Expand an object schema into flat leaf descriptors, depth first in
    /// declaration order. Keys are `prefix.child`, or just `child` when the
    /// prefix is empty.
    pub fn walk(schema: &Schema, prefix: &str) -> SettingsResult<Vec<FieldDescriptor>> {
        let Schema::Object { properties, .. } = schema else {
            return Err(SettingsError::NotAnObject);
        };

        let mut fields = Vec::new();
        for (name, child) in properties.iter() {
            let key = if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") };
            if child.is_object() {
                fields.extend(Self::walk(child, &key)?);
            } else if let Some(field) = FieldDescriptor::from_leaf(key, child) {
                fields.push(field);
            }
        }
        Ok(fields)
    }

    /// Flat map of every leaf default.
    pub fn defaults(schema: &Schema) -> SettingsResult<Map<String, Value>> {
        Ok(Self::walk(schema, "")?.into_iter().map(|f| (f.key, f.default)).collect())
    }

    /// Resolve stored overrides against an optional schema.
    ///
    /// A missing or unwalkable schema resolves to the stored map as-is.
    pub fn effective_settings(
        schema: Option<&Schema>,
        stored: &Map<String, Value>,
    ) -> EffectiveSettings {
        let mut resolved = stored.clone();

        if let Some(fields) = schema.and_then(|s| Self::walk(s, "").ok()) {
            for field in fields {
                let value = match stored.get(&field.key) {
                    Some(value) if field.accepts(value) => value.clone(),
                    _ => field.default,
                };
                resolved.insert(field.key, value);
            }
        }

        EffectiveSettings(resolved)
    }

    /// Check a candidate value for a field.
    pub fn validate(&self, field: &FieldDescriptor, value: &Value) -> SettingsResult<()> {
        if !field.accepts(value) {
            return Err(SettingsError::InvalidValue {
                key: field.key.clone(),
                expected: field.kind.expected(),
            });
        }

        if !self.enforce_bounds {
            return Ok(());
        }

        match &field.kind {
            FieldKind::Number { minimum, maximum } => {
                let n = value.as_f64().unwrap_or_default();
                let below = minimum.is_some_and(|min| n < min);
                let above = maximum.is_some_and(|max| n > max);
                if below || above {
                    return Err(SettingsError::OutOfRange {
                        key: field.key.clone(),
                        value: n,
                        range: format_range(*minimum, *maximum),
                    });
                }
            }
            FieldKind::Choice { options } => {
                let s = value.as_str().unwrap_or_default();
                if !options.iter().any(|o| o == s) {
                    return Err(SettingsError::NotInEnum {
                        key: field.key.clone(),
                        value: s.to_string(),
                        choices: options.join(", "),
                    });
                }
            }
            FieldKind::Toggle | FieldKind::Text { .. } => {}
        }

        Ok(())
    }
}

fn format_range(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{min}, {max}]"),
        (Some(min), None) => format!("[{min}, ∞)"),
        (None, Some(max)) => format!("(-∞, {max}]"),
        (None, None) => "(-∞, ∞)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn goals_schema() -> Schema {
        Schema::object()
            .with("title", Schema::string("Title", "Today"))
            .with(
                "dailyGoals",
                Schema::object()
                    .with("steps", Schema::number("Steps", 8000).bounded(Some(0.0), Some(50000.0)))
                    .with("water", Schema::number("Water (glasses)", 8)),
            )
            .with("units", Schema::choice("Units", "metric", ["metric", "imperial"]))
            .with("celebrate", Schema::boolean("Celebrate", true))
    }

    #[test]
    fn test_walk_flattens_with_dotted_keys() {
        let fields = SettingsSchemaEngine::walk(&goals_schema(), "").unwrap();
        let keys: Vec<_> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "dailyGoals.steps", "dailyGoals.water", "units", "celebrate"]);
        assert_eq!(fields[1].kind, FieldKind::Number { minimum: Some(0.0), maximum: Some(50000.0) });
        assert_eq!(fields[3].kind.label(), "choice");
    }

    #[test]
    fn test_walk_with_prefix() {
        let schema = Schema::object().with("steps", Schema::number("Steps", 1));
        let fields = SettingsSchemaEngine::walk(&schema, "dailyGoals").unwrap();
        assert_eq!(fields[0].key, "dailyGoals.steps");
    }

    #[test]
    fn test_walk_rejects_leaf_root() {
        let result = SettingsSchemaEngine::walk(&Schema::boolean("x", true), "");
        assert_eq!(result, Err(SettingsError::NotAnObject));
    }

    #[test]
    fn test_title_falls_back_to_key() {
        let schema = Schema::object().with("plain", Schema::boolean("", false));
        let fields = SettingsSchemaEngine::walk(&schema, "").unwrap();
        assert_eq!(fields[0].title, "plain");
    }

    #[test]
    fn test_effective_value() {
        let node = Schema::number("Steps", 8000);
        assert_eq!(SettingsSchemaEngine::effective_value(&node, None), Some(json!(8000)));
        assert_eq!(SettingsSchemaEngine::effective_value(&node, Some(&json!(12000))), Some(json!(12000)));
        // Incompatible stored values fall back to the default.
        assert_eq!(SettingsSchemaEngine::effective_value(&node, Some(&json!("lots"))), Some(json!(8000)));
        assert_eq!(SettingsSchemaEngine::effective_value(&Schema::object(), Some(&json!(1))), None);
    }

    #[test]
    fn test_effective_settings_merges_defaults_and_overrides() {
        let mut stored = Map::new();
        stored.insert("dailyGoals.steps".into(), json!(10000));
        stored.insert("slots".into(), json!(["dashboard"]));

        let effective = SettingsSchemaEngine::effective_settings(Some(&goals_schema()), &stored);

        assert_eq!(effective.number("dailyGoals.steps"), Some(10000.0));
        assert_eq!(effective.number("dailyGoals.water"), Some(8.0));
        assert_eq!(effective.str("units"), Some("metric"));
        assert_eq!(effective.bool("celebrate"), Some(true));
        assert_eq!(effective.get("slots"), Some(&json!(["dashboard"])));
        assert_eq!(effective.len(), 6);
    }

    #[test]
    fn test_effective_settings_without_schema() {
        let mut stored = Map::new();
        stored.insert("a".into(), json!(1));
        let effective = SettingsSchemaEngine::effective_settings(None, &stored);
        assert_eq!(effective.into_inner(), stored);
    }

    #[test]
    fn test_defaults() {
        let defaults = SettingsSchemaEngine::defaults(&goals_schema()).unwrap();
        assert_eq!(defaults.get("title"), Some(&json!("Today")));
        assert_eq!(defaults.get("dailyGoals.water"), Some(&json!(8)));
    }

    #[test]
    fn test_validate_permissive_by_default() {
        let engine = SettingsSchemaEngine::default();
        let fields = SettingsSchemaEngine::walk(&goals_schema(), "").unwrap();

        assert!(engine.validate(&fields[1], &json!(-5)).is_ok());
        assert!(engine.validate(&fields[3], &json!("kelvin")).is_ok());
        assert!(matches!(
            engine.validate(&fields[1], &json!("many")),
            Err(SettingsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_enforcing_bounds() {
        let engine = SettingsSchemaEngine::new(true);
        let fields = SettingsSchemaEngine::walk(&goals_schema(), "").unwrap();

        assert!(engine.validate(&fields[1], &json!(100)).is_ok());
        assert!(matches!(
            engine.validate(&fields[1], &json!(-5)),
            Err(SettingsError::OutOfRange { .. })
        ));
        assert!(matches!(
            engine.validate(&fields[3], &json!("kelvin")),
            Err(SettingsError::NotInEnum { .. })
        ));
        assert!(engine.validate(&fields[3], &json!("imperial")).is_ok());
    }
}

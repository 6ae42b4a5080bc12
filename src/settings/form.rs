//! Settings form: the editable view of one plugin's configuration.

use std::fmt;

use serde_json::{Map, Number, Value};

use super::{FieldDescriptor, FieldKind, SettingsError, SettingsResult, SettingsSchemaEngine};
use crate::plugin::PluginDescriptor;

/// A field together with its current effective value.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Field description.
    pub descriptor: FieldDescriptor,
    /// Stored override, or the default.
    pub value: Value,
    /// Whether `value` came from a stored override.
    pub overridden: bool,
}

/// Editable settings of a single plugin.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    plugin_id: String,
    plugin_name: String,
    fields: Vec<FormField>,
    engine: SettingsSchemaEngine,
    pending: Map<String, Value>,
}

impl SettingsForm {
    /// Build the form for a plugin.
    ///
    /// A plugin without a schema, or with a schema that cannot be walked,
    /// gets a form with no fields.
    pub fn for_plugin(plugin: &PluginDescriptor, engine: SettingsSchemaEngine) -> Self {
        let fields = match plugin.settings_schema.as_ref().map(|s| SettingsSchemaEngine::walk(s, "")) {
            Some(Ok(fields)) => fields,
            Some(Err(e)) => {
                tracing::warn!(plugin = %plugin.id, error = %e, "Settings schema cannot be walked");
                Vec::new()
            }
            None => Vec::new(),
        };

        let fields = fields
            .into_iter()
            .map(|descriptor| {
                let stored = plugin.settings.get(&descriptor.key);
                let overridden = stored.is_some_and(|v| descriptor.accepts(v));
                let value = match stored {
                    Some(v) if overridden => v.clone(),
                    _ => descriptor.default.clone(),
                };
                FormField { descriptor, value, overridden }
            })
            .collect();

        Self {
            plugin_id: plugin.id.clone(),
            plugin_name: plugin.name.clone(),
            fields,
            engine,
            pending: Map::new(),
        }
    }

    /// Id of the plugin this form edits.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Whether the plugin has anything to configure.
    pub fn is_configurable(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Fields in schema order.
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Look up a field by dotted key.
    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.descriptor.key == key)
    }

    /// Parse raw user input for a field into a typed value and validate it.
    pub fn parse_input(&self, key: &str, raw: &str) -> SettingsResult<Value> {
        let field =
            self.field(key).ok_or_else(|| SettingsError::UnknownField(key.to_string()))?;
        let descriptor = &field.descriptor;

        let value = match descriptor.kind {
            FieldKind::Toggle => parse_bool(raw).map(Value::Bool),
            FieldKind::Number { .. } => parse_number(raw).map(Value::Number),
            FieldKind::Choice { .. } | FieldKind::Text { .. } => {
                Some(Value::String(raw.to_string()))
            }
        }
        .ok_or_else(|| SettingsError::InvalidValue {
            key: key.to_string(),
            expected: match descriptor.kind {
                FieldKind::Toggle => "a boolean",
                _ => "a number",
            },
        })?;

        self.engine.validate(descriptor, &value)?;
        Ok(value)
    }

    /// Stage an edit from raw input. The form's displayed value updates;
    /// nothing is stored until [`take_changes`](Self::take_changes) is applied.
    pub fn set(&mut self, key: &str, raw: &str) -> SettingsResult<()> {
        let value = self.parse_input(key, raw)?;
        if let Some(field) = self.fields.iter_mut().find(|f| f.descriptor.key == key) {
            field.value = value.clone();
            field.overridden = true;
        }
        self.pending.insert(key.to_string(), value);
        Ok(())
    }

    /// Drain staged edits as a partial map for `update_settings`.
    pub fn take_changes(&mut self) -> Map<String, Value> {
        std::mem::take(&mut self.pending)
    }

    /// Put every field back to its default and drop staged edits.
    pub fn reset(&mut self) {
        self.pending.clear();
        for field in &mut self.fields {
            field.value = field.descriptor.default.clone();
            field.overridden = false;
        }
    }
}

impl fmt::Display for SettingsForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.plugin_name, self.plugin_id)?;
        if !self.is_configurable() {
            return writeln!(f, "  No configurable settings");
        }

        for field in &self.fields {
            let d = &field.descriptor;
            let marker = if field.overridden { "*" } else { " " };
            write!(f, " {marker} {:<28} {:<8} = {}", d.key, d.kind.label(), field.value)?;
            match &d.kind {
                FieldKind::Number { minimum, maximum } if minimum.is_some() || maximum.is_some() => {
                    let min = minimum.map_or_else(|| "-".to_string(), |v| v.to_string());
                    let max = maximum.map_or_else(|| "-".to_string(), |v| v.to_string());
                    write!(f, "  [{min}..{max}]")?;
                }
                FieldKind::Choice { options } => write!(f, "  ({})", options.join("|"))?,
                _ => {}
            }
            writeln!(f, "  # {}", d.title)?;
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Number::from(i));
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Schema;
    use serde_json::json;

    fn plugin() -> PluginDescriptor {
        let mut plugin = PluginDescriptor::new("daily-goals", "Daily Goals").with_schema(
            Schema::object()
                .with(
                    "dailyGoals",
                    Schema::object()
                        .with("steps", Schema::number("Steps", 8000).bounded(Some(0.0), None)),
                )
                .with("units", Schema::choice("Units", "metric", ["metric", "imperial"]))
                .with("celebrate", Schema::boolean("Celebrate", true))
                .with("note", Schema::string("Note", "").multiline()),
        );
        plugin.settings.insert("units".into(), json!("imperial"));
        plugin
    }

    #[test]
    fn test_form_shows_effective_values() {
        let form = SettingsForm::for_plugin(&plugin(), SettingsSchemaEngine::default());

        assert!(form.is_configurable());
        assert_eq!(form.fields().len(), 4);
        assert_eq!(form.field("units").unwrap().value, json!("imperial"));
        assert!(form.field("units").unwrap().overridden);
        assert_eq!(form.field("dailyGoals.steps").unwrap().value, json!(8000));
        assert!(!form.field("dailyGoals.steps").unwrap().overridden);
    }

    #[test]
    fn test_form_without_schema() {
        let plugin = PluginDescriptor::new("bare", "Bare");
        let form = SettingsForm::for_plugin(&plugin, SettingsSchemaEngine::default());

        assert!(!form.is_configurable());
        assert!(form.to_string().contains("No configurable settings"));
    }

    #[test]
    fn test_form_with_unwalkable_schema() {
        let plugin = PluginDescriptor::new("odd", "Odd").with_schema(Schema::boolean("root", true));
        let form = SettingsForm::for_plugin(&plugin, SettingsSchemaEngine::default());
        assert!(!form.is_configurable());
    }

    #[test]
    fn test_parse_input_by_kind() {
        let form = SettingsForm::for_plugin(&plugin(), SettingsSchemaEngine::default());

        assert_eq!(form.parse_input("celebrate", "off").unwrap(), json!(false));
        assert_eq!(form.parse_input("dailyGoals.steps", "12000").unwrap(), json!(12000));
        assert_eq!(form.parse_input("dailyGoals.steps", "2.5").unwrap(), json!(2.5));
        assert_eq!(form.parse_input("note", "line one\nline two").unwrap(), json!("line one\nline two"));
        assert!(matches!(
            form.parse_input("dailyGoals.steps", "lots"),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert!(matches!(form.parse_input("missing", "1"), Err(SettingsError::UnknownField(_))));
    }

    #[test]
    fn test_bounds_only_checked_when_enforced() {
        let permissive = SettingsForm::for_plugin(&plugin(), SettingsSchemaEngine::default());
        assert!(permissive.parse_input("dailyGoals.steps", "-1").is_ok());
        assert!(permissive.parse_input("units", "kelvin").is_ok());

        let strict = SettingsForm::for_plugin(&plugin(), SettingsSchemaEngine::new(true));
        assert!(matches!(
            strict.parse_input("dailyGoals.steps", "-1"),
            Err(SettingsError::OutOfRange { .. })
        ));
        assert!(matches!(strict.parse_input("units", "kelvin"), Err(SettingsError::NotInEnum { .. })));
    }

    #[test]
    fn test_set_and_take_changes() {
        let mut form = SettingsForm::for_plugin(&plugin(), SettingsSchemaEngine::default());
        form.set("dailyGoals.steps", "9000").unwrap();
        form.set("celebrate", "no").unwrap();
        assert!(form.set("celebrate", "maybe").is_err());

        assert_eq!(form.field("dailyGoals.steps").unwrap().value, json!(9000));

        let changes = form.take_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get("celebrate"), Some(&json!(false)));
        assert!(form.take_changes().is_empty());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut form = SettingsForm::for_plugin(&plugin(), SettingsSchemaEngine::default());
        form.set("celebrate", "false").unwrap();
        form.reset();

        assert_eq!(form.field("units").unwrap().value, json!("metric"));
        assert_eq!(form.field("celebrate").unwrap().value, json!(true));
        assert!(form.fields().iter().all(|f| !f.overridden));
        assert!(form.take_changes().is_empty());
    }

    #[test]
    fn test_display_lists_fields() {
        let form = SettingsForm::for_plugin(&plugin(), SettingsSchemaEngine::default());
        let text = form.to_string();
        assert!(text.contains("dailyGoals.steps"));
        assert!(text.contains("[0..-]"));
        assert!(text.contains("(metric|imperial)"));
    }
}

//! Declarative settings schema.
//!
//! A schema is a tree of typed nodes. Leaves describe a single configurable
//! value; objects group children for presentation. On the wire a node is a
//! JSON object tagged by `type`:
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": {
//!     "units": { "type": "string", "title": "Units", "default": "metric", "enum": ["metric", "imperial"] },
//!     "dailyGoals": {
//!       "type": "object",
//!       "properties": {
//!         "steps": { "type": "number", "title": "Steps", "default": 8000, "minimum": 0 }
//!       }
//!     }
//!   }
//! }
//! ```

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// A schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    /// On/off value.
    Boolean {
        /// Human-readable label.
        #[serde(default)]
        title: String,
        /// Value used when nothing is stored.
        #[serde(default)]
        default: bool,
    },

    /// Numeric value with optional descriptive bounds.
    Number {
        /// Human-readable label.
        #[serde(default)]
        title: String,
        /// Value used when nothing is stored.
        #[serde(default = "zero")]
        default: Number,
        /// Lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },

    /// Text value, either freeform or a closed choice.
    String {
        /// Human-readable label.
        #[serde(default)]
        title: String,
        /// Value used when nothing is stored.
        #[serde(default)]
        default: String,
        /// Allowed values, when the field is a closed choice.
        #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
        choices: Option<Vec<String>>,
        /// Whether the editor should accept multiple lines.
        #[serde(default, skip_serializing_if = "is_false")]
        multiline: bool,
    },

    /// Group of named children.
    Object {
        /// Optional group heading.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Children in declaration order.
        #[serde(default)]
        properties: Properties,
    },
}

fn zero() -> Number {
    Number::from(0)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl Schema {
    /// Create an empty object node.
    pub fn object() -> Self {
        Self::Object { title: None, properties: Properties::default() }
    }

    /// Create a boolean leaf.
    pub fn boolean(title: impl Into<String>, default: bool) -> Self {
        Self::Boolean { title: title.into(), default }
    }

    /// Create a number leaf without bounds.
    pub fn number(title: impl Into<String>, default: impl Into<Number>) -> Self {
        Self::Number { title: title.into(), default: default.into(), minimum: None, maximum: None }
    }

    /// Create a freeform single-line string leaf.
    pub fn string(title: impl Into<String>, default: impl Into<String>) -> Self {
        Self::String { title: title.into(), default: default.into(), choices: None, multiline: false }
    }

    /// Create a closed-choice string leaf.
    pub fn choice<I, S>(title: impl Into<String>, default: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::String {
            title: title.into(),
            default: default.into(),
            choices: Some(choices.into_iter().map(Into::into).collect()),
            multiline: false,
        }
    }

    /// Set bounds on a number leaf. Other nodes are returned unchanged.
    pub fn bounded(self, min: Option<f64>, max: Option<f64>) -> Self {
        match self {
            Self::Number { title, default, .. } => {
                Self::Number { title, default, minimum: min, maximum: max }
            }
            other => other,
        }
    }

    /// Mark a string leaf as multiline. Other nodes are returned unchanged.
    pub fn multiline(self) -> Self {
        match self {
            Self::String { title, default, choices, .. } => {
                Self::String { title, default, choices, multiline: true }
            }
            other => other,
        }
    }

    /// Add a child to an object node. Leaves are returned unchanged.
    pub fn with(mut self, key: impl Into<String>, child: Schema) -> Self {
        if let Self::Object { properties, .. } = &mut self {
            properties.insert(key, child);
        }
        self
    }

    /// Set the heading of an object node, or the title of a leaf.
    pub fn titled(mut self, new_title: impl Into<String>) -> Self {
        let new_title = new_title.into();
        match &mut self {
            Self::Object { title, .. } => *title = Some(new_title),
            Self::Boolean { title, .. } | Self::Number { title, .. } | Self::String { title, .. } => {
                *title = new_title;
            }
        }
        self
    }

    /// Whether this node is an object.
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }

    /// Title of the node, if any.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Boolean { title, .. } | Self::Number { title, .. } | Self::String { title, .. } => {
                Some(title.as_str())
            }
            Self::Object { title, .. } => title.as_deref(),
        }
    }

    /// Default value of a leaf. Objects have none.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Boolean { default, .. } => Some(Value::Bool(*default)),
            Self::Number { default, .. } => Some(Value::Number(default.clone())),
            Self::String { default, .. } => Some(Value::String(default.clone())),
            Self::Object { .. } => None,
        }
    }

    /// Whether `value` has the JSON type this leaf stores.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Boolean { .. } => value.is_boolean(),
            Self::Number { .. } => value.is_number(),
            Self::String { .. } => value.is_string(),
            Self::Object { .. } => false,
        }
    }

    /// Look up a node by dotted path (`dailyGoals.steps`).
    pub fn lookup(&self, path: &str) -> Option<&Schema> {
        path.split('.').try_fold(self, |node, segment| match node {
            Self::Object { properties, .. } => properties.get(segment),
            _ => None,
        })
    }
}

/// Ordered children of an object node.
///
/// Stored as a list so that fields are presented in the order the plugin
/// author declared them, independent of the JSON map implementation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, Schema)>);

impl Properties {
    /// Insert or replace a child, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, schema: Schema) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = schema;
        } else {
            self.0.push((key, schema));
        }
    }

    /// Get a child by key.
    pub fn get(&self, key: &str) -> Option<&Schema> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    /// Iterate children in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.0.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, schema) in &self.0 {
            map.serialize_entry(key, schema)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = Properties;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to schema nodes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Properties, A::Error> {
                let mut properties = Properties::default();
                while let Some((key, schema)) = access.next_entry::<String, Schema>()? {
                    properties.insert(key, schema);
                }
                Ok(properties)
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wire_shape() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "object",
            "properties": {
                "units": { "type": "string", "title": "Units", "default": "metric", "enum": ["metric", "imperial"] },
                "refresh": { "type": "number", "title": "Refresh", "default": 15, "minimum": 5, "maximum": 120 },
                "showIcon": { "type": "boolean", "title": "Show icon", "default": true }
            }
        }))
        .unwrap();

        let Schema::Object { properties, .. } = &schema else { panic!("expected object") };
        assert_eq!(properties.len(), 3);
        assert_eq!(
            schema.lookup("refresh"),
            Some(&Schema::number("Refresh", 15).bounded(Some(5.0), Some(120.0)))
        );
        assert_eq!(
            schema.lookup("units"),
            Some(&Schema::choice("Units", "metric", ["metric", "imperial"]))
        );
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let schema: Schema = serde_json::from_str(
            r#"{"type":"object","properties":{"zeta":{"type":"boolean"},"alpha":{"type":"boolean"},"mid":{"type":"boolean"}}}"#,
        )
        .unwrap();

        let Schema::Object { properties, .. } = schema else { panic!("expected object") };
        let keys: Vec<_> = properties.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let schema = Schema::object()
            .with("b", Schema::boolean("B", false))
            .with("a", Schema::string("A", "x").multiline());

        let text = serde_json::to_string(&schema).unwrap();
        let b = text.find("\"b\"").unwrap();
        let a = text.find("\"a\"").unwrap();
        assert!(b < a);
        assert!(text.contains("\"multiline\":true"));

        let back: Schema = serde_json::from_str(&text).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_lookup_nested() {
        let schema = Schema::object().with(
            "dailyGoals",
            Schema::object().with("steps", Schema::number("Steps", 8000)),
        );

        assert!(schema.lookup("dailyGoals").unwrap().is_object());
        assert_eq!(schema.lookup("dailyGoals.steps").unwrap().title(), Some("Steps"));
        assert!(schema.lookup("dailyGoals.water").is_none());
        assert!(schema.lookup("dailyGoals.steps.deeper").is_none());
    }

    #[test]
    fn test_accepts() {
        assert!(Schema::boolean("x", false).accepts(&json!(true)));
        assert!(!Schema::boolean("x", false).accepts(&json!("true")));
        assert!(Schema::number("x", 1).accepts(&json!(2.5)));
        assert!(!Schema::string("x", "").accepts(&json!(3)));
        assert!(!Schema::object().accepts(&json!({})));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<Schema, _> = serde_json::from_value(json!({ "type": "color" }));
        assert!(result.is_err());
    }
}

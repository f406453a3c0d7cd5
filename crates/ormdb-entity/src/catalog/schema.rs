//! Persistable schema descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::validation::RuleSpec;
use crate::value::Value;

/// How a property computes its default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultSpec {
    /// A fixed value.
    Literal(Value),
    /// A registered provider, invoked for every new entity.
    Provider(String),
}

/// Schema of one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Property name, lower-cased.
    pub name: String,
    /// Property type tag.
    #[serde(rename = "type", default = "generic_tag")]
    pub type_tag: String,
    /// Whether a value is required.
    #[serde(default)]
    pub required: bool,
    /// Maximum length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Whether the value varies per locale.
    #[serde(default)]
    pub i18n: bool,
    /// Whether the property holds a collection.
    #[serde(default)]
    pub many: bool,
    /// Explicit default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultSpec>,
    /// Referenced class for single-class references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Candidate classes for multi-class references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    /// Allowed values.
    #[serde(default, rename = "in", skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Value>,
    /// Extra validation rules, applied after the built-in ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<RuleSpec>,
    /// Message overrides per rule name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, String>,
    /// Sort key within the definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Free-form parameters for collaborators.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, Value>,
}

fn generic_tag() -> String {
    "generic".to_string()
}

impl PropertySchema {
    /// Create a property of the given type.
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            type_tag: type_tag.into().to_lowercase(),
            required: false,
            length: None,
            i18n: false,
            many: false,
            default: None,
            entity: None,
            entities: None,
            allowed: Vec::new(),
            validation: Vec::new(),
            messages: BTreeMap::new(),
            position: None,
            custom: BTreeMap::new(),
        }
    }

    /// Pass-through property.
    pub fn generic(name: impl Into<String>) -> Self {
        Self::new(name, "generic")
    }

    /// Integer property.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, "integer")
    }

    /// Date property.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, "date")
    }

    /// Datetime property.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, "datetime")
    }

    /// Reference to an entity of `class`.
    pub fn reference(name: impl Into<String>, class: impl Into<String>) -> Self {
        let mut schema = Self::new(name, "entity");
        schema.entity = Some(class.into());
        schema
    }

    /// Reference to an entity of any of `classes`, set as `[class, id]`.
    pub fn polymorphic_reference(
        name: impl Into<String>,
        classes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut schema = Self::new(name, "entity");
        schema.entities = Some(classes.into_iter().map(Into::into).collect());
        schema
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Limit the length.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Store one value per locale.
    pub fn i18n(mut self) -> Self {
        self.i18n = true;
        self
    }

    /// Hold a collection of values.
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Use a fixed default.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultSpec::Literal(value.into()));
        self
    }

    /// Use a registered default provider.
    pub fn with_default_provider(mut self, tag: impl Into<String>) -> Self {
        self.default = Some(DefaultSpec::Provider(tag.into()));
        self
    }

    /// Restrict to the given values.
    pub fn with_allowed(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Add a validation rule.
    pub fn with_rule(mut self, rule: RuleSpec) -> Self {
        self.validation.push(rule);
        self
    }

    /// Override the message of a rule.
    pub fn with_message(mut self, rule: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(rule.into().to_lowercase(), message.into());
        self
    }

    /// Set the position within the definition.
    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach a free-form parameter.
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

/// Schema of an entity class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSchema {
    /// Entity class identifier.
    pub class: String,
    /// Properties in declaration order.
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
    /// Message overrides: attribute → rule → message.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, BTreeMap<String, String>>,
}

impl DefinitionSchema {
    /// Create an empty schema.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: Vec::new(),
            messages: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, property: PropertySchema) -> Self {
        self.properties.push(property);
        self
    }

    /// Add several properties.
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = PropertySchema>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Override a message for one attribute and rule.
    pub fn with_message(
        mut self,
        attribute: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.messages
            .entry(attribute.into().to_lowercase())
            .or_default()
            .insert(rule.into().to_lowercase(), message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_builder() {
        let schema = PropertySchema::generic("Title")
            .required()
            .with_length(50)
            .i18n()
            .with_message("Required", "A title is needed.");

        assert_eq!(schema.name, "title");
        assert!(schema.required && schema.i18n && !schema.many);
        assert_eq!(schema.length, Some(50));
        assert_eq!(schema.messages["required"], "A title is needed.");
    }

    #[test]
    fn test_schema_json() {
        let schema = DefinitionSchema::new("Article")
            .with_property(PropertySchema::reference("author", "User"))
            .with_property(
                PropertySchema::generic("status")
                    .with_allowed(["draft", "published"])
                    .with_default("draft"),
            )
            .with_property(PropertySchema::datetime("created_at").with_default_provider("now"))
            .with_message("status", "in", "Unknown status.");

        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"type\":\"entity\""));
        assert!(json.contains("\"in\":"));

        let back: DefinitionSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_minimal_json() {
        let schema: PropertySchema = serde_json::from_str(r#"{"name":"body"}"#).unwrap();
        assert_eq!(schema.type_tag, "generic");
        assert!(!schema.required);
        assert!(schema.default.is_none());
    }
}

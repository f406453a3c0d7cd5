//! A property schema bound to its type.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::{debug, warn};

use super::schema::{DefaultSpec, PropertySchema};
use crate::collection::ManyCollection;
use crate::error::{CoercionError, SchemaError};
use crate::types::{CoercionContext, DefaultProvider, DefaultProviders, PropertyType, TypeRegistry};
use crate::validation::AttributeValidator;
use crate::value::Value;

#[derive(Clone)]
enum ResolvedDefault {
    None,
    Literal(Value),
    Provider(Arc<dyn DefaultProvider>),
}

/// A property of a definition: schema, type and resolved default.
#[derive(Clone)]
pub struct Property {
    schema: PropertySchema,
    kind: Arc<dyn PropertyType>,
    default: ResolvedDefault,
}

impl Property {
    /// Resolve a schema against the type and provider registries.
    pub fn build(
        class: &str,
        mut schema: PropertySchema,
        types: &TypeRegistry,
        providers: &DefaultProviders,
    ) -> Result<Self, SchemaError> {
        schema.name = schema.name.to_lowercase();

        let kind = types
            .get(&schema.type_tag)
            .ok_or_else(|| SchemaError::UnknownType {
                class: class.to_string(),
                property: schema.name.clone(),
                type_tag: schema.type_tag.clone(),
            })?;

        let default = match &schema.default {
            None => ResolvedDefault::None,
            Some(DefaultSpec::Literal(value)) => ResolvedDefault::Literal(value.clone()),
            Some(DefaultSpec::Provider(tag)) => ResolvedDefault::Provider(
                providers
                    .get(tag)
                    .ok_or_else(|| SchemaError::UnknownDefaultProvider(tag.clone()))?,
            ),
        };

        if schema.entities.as_ref().is_some_and(|c| c.is_empty()) {
            return Err(SchemaError::InvalidSchema {
                class: class.to_string(),
                reason: format!("{} lists no referenced classes", schema.name),
            });
        }

        Ok(Self {
            schema,
            kind,
            default,
        })
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Underlying schema.
    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    /// Property type.
    pub fn property_type(&self) -> &Arc<dyn PropertyType> {
        &self.kind
    }

    /// Whether values vary per locale.
    pub fn is_i18n(&self) -> bool {
        self.schema.i18n
    }

    /// Whether the property holds a collection.
    pub fn is_many(&self) -> bool {
        self.schema.many
    }

    /// Whether a value is required.
    pub fn is_required(&self) -> bool {
        self.schema.required
    }

    /// Read a free-form parameter.
    pub fn custom(&self, key: &str) -> Option<&Value> {
        self.schema.custom.get(key)
    }

    /// An empty collection bound to `owner` and this property.
    pub fn empty_collection(&self, owner: &str) -> ManyCollection {
        let collection = ManyCollection::new(owner, self.name());
        match self.kind.collection_target(&self.schema) {
            Some(target) => collection.with_target(target),
            None => collection,
        }
    }

    /// Default value for a new entity of class `owner`.
    pub fn default_value(&self, owner: &str) -> Value {
        if self.schema.many {
            return Value::Collection(self.empty_collection(owner));
        }
        match &self.default {
            ResolvedDefault::Literal(value) => value.clone(),
            ResolvedDefault::Provider(provider) => provider.produce(),
            ResolvedDefault::None => self.kind.zero_value(),
        }
    }

    /// Encode a value for storage.
    ///
    /// A `many` property encodes to an array, skipping elements without an
    /// encoding; anything but a collection encodes as an empty array.
    pub fn serialize(&self, value: &Value) -> Json {
        if self.schema.many {
            let items = match value {
                Value::Collection(collection) => collection
                    .iter()
                    .filter_map(|item| self.kind.encode(item))
                    .collect(),
                _ => Vec::new(),
            };
            return Json::Array(items);
        }
        self.kind.encode(value).unwrap_or_else(|| {
            warn!(property = %self.schema.name, kind = value.type_name(), "value has no encoding, storing null");
            Json::Null
        })
    }

    /// Decode a stored value for an entity of class `owner`.
    ///
    /// A `many` payload that is not an array (or a JSON text holding one)
    /// decodes to an empty collection.
    pub fn deserialize(&self, raw: &Json, owner: &str) -> Value {
        if !self.schema.many {
            return self.kind.decode(raw);
        }
        let mut collection = self.empty_collection(owner);
        let parsed;
        let items = match raw {
            Json::Array(items) => Some(items),
            Json::String(text) => {
                parsed = serde_json::from_str::<Json>(text).ok();
                parsed.as_ref().and_then(Json::as_array)
            }
            _ => None,
        };
        match items {
            Some(items) => {
                collection.set_all(items.iter().map(|item| self.kind.decode(item)));
            }
            None => {
                warn!(property = %self.schema.name, "stored collection is not an array");
            }
        }
        Value::Collection(collection)
    }

    /// Coerce a value written through the soft set path.
    ///
    /// In silent mode a coercion failure becomes Null.
    pub fn coerce(&self, value: Value, owner: &str, silent: bool) -> Result<Value, CoercionError> {
        if self.schema.many {
            return match value {
                Value::List(items) => {
                    let mut collection = self.empty_collection(owner);
                    for item in items {
                        collection.push(self.coerce_one(item, owner, silent)?);
                    }
                    Ok(Value::Collection(collection))
                }
                other => Ok(other),
            };
        }
        self.coerce_one(value, owner, silent)
    }

    fn coerce_one(&self, value: Value, owner: &str, silent: bool) -> Result<Value, CoercionError> {
        let ctx = CoercionContext {
            owner,
            schema: &self.schema,
        };
        match self.kind.coerce(value, &ctx) {
            Err(e) if silent => {
                debug!(class = owner, property = %self.schema.name, error = %e, "coercion failed, storing null");
                Ok(Value::Null)
            }
            other => other,
        }
    }

    /// Attach this property's rules: structural, then type, then custom.
    pub fn prepare_validator(&self, validator: &mut AttributeValidator) {
        if self.schema.required {
            validator.rule("required", vec![Value::Bool(true)]);
        }
        if let Some(length) = self.schema.length {
            validator.rule("maxlength", vec![Value::Int(length as i64)]);
        }
        if !self.schema.allowed.is_empty() {
            validator.rule("in", vec![Value::List(self.schema.allowed.clone())]);
        }
        self.kind.contribute_validation(&self.schema, validator);
        validator.rules(self.schema.validation.iter().cloned());
    }

    /// Type messages overlaid by schema messages.
    pub fn messages(&self) -> BTreeMap<String, String> {
        let mut messages = self.kind.messages();
        messages.extend(
            self.schema
                .messages
                .iter()
                .map(|(rule, message)| (rule.clone(), message.clone())),
        );
        messages
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.schema.name)
            .field("type", &self.kind.tag())
            .field("i18n", &self.schema.i18n)
            .field("many", &self.schema.many)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EntityRef;

    fn build(schema: PropertySchema) -> Property {
        Property::build(
            "Article",
            schema,
            &TypeRegistry::default(),
            &DefaultProviders::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(build(PropertySchema::generic("body")).default_value("Article"), Value::Null);
        assert_eq!(build(PropertySchema::date("on")).default_value("Article"), Value::Null);
        assert_eq!(
            build(PropertySchema::generic("status").with_default("draft")).default_value("Article"),
            Value::from("draft")
        );
        assert!(matches!(
            build(PropertySchema::datetime("at").with_default_provider("now")).default_value("Article"),
            Value::Datetime(_)
        ));

        let tags = build(PropertySchema::generic("tags").many()).default_value("Article");
        let collection = tags.as_collection().unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.owner(), "Article");
        assert_eq!(collection.property(), "tags");
    }

    #[test]
    fn test_build_errors() {
        let types = TypeRegistry::default();
        let providers = DefaultProviders::default();
        assert!(matches!(
            Property::build("Article", PropertySchema::new("x", "money"), &types, &providers),
            Err(SchemaError::UnknownType { .. })
        ));
        assert!(matches!(
            Property::build(
                "Article",
                PropertySchema::generic("x").with_default_provider("later"),
                &types,
                &providers
            ),
            Err(SchemaError::UnknownDefaultProvider(_))
        ));
    }

    #[test]
    fn test_many_serialization() {
        let property = build(PropertySchema::generic("tags").many());
        let value = Value::Collection(
            ManyCollection::new("Article", "tags").with_items([Value::from("a"), Value::from("b")]),
        );

        let encoded = property.serialize(&value);
        assert_eq!(encoded, serde_json::json!(["a", "b"]));

        let decoded = property.deserialize(&encoded, "Article");
        assert_eq!(decoded, value);
        assert_eq!(property.serialize(&decoded), encoded);

        assert_eq!(property.serialize(&Value::from("a")), serde_json::json!([]));
        let garbage = property.deserialize(&Json::from(42), "Article");
        assert!(garbage.as_collection().unwrap().is_empty());
        let text = property.deserialize(&Json::from(r#"["x"]"#), "Article");
        assert_eq!(text.as_collection().unwrap().len(), 1);
    }

    #[test]
    fn test_many_skips_unencodable() {
        let property = build(PropertySchema::generic("scores").many());
        let value = Value::Collection(
            ManyCollection::new("Article", "scores").with_items([Value::Float(1.5), Value::Float(f64::NAN)]),
        );
        assert_eq!(property.serialize(&value), serde_json::json!([1.5]));
    }

    #[test]
    fn test_coerce_many_references() {
        let property = build(PropertySchema::reference("authors", "User").many());
        let coerced = property
            .coerce(Value::from(vec![1i64, 2]), "Article", false)
            .unwrap();
        let collection = coerced.as_collection().unwrap();
        assert_eq!(collection.target(), Some("User"));
        assert_eq!(collection.get(1), Some(&Value::Reference(EntityRef::new("User", 2))));
    }

    #[test]
    fn test_silent_coercion() {
        let property = build(PropertySchema::date("published_on"));
        assert!(property.coerce(Value::from("tomorrow"), "Article", false).is_err());
        assert_eq!(
            property.coerce(Value::from("tomorrow"), "Article", true).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_rule_order_and_messages() {
        let property = build(
            PropertySchema::date("published_on")
                .required()
                .with_length(10)
                .with_allowed(["2024-01-01"])
                .with_rule(crate::validation::RuleSpec::new("min", vec![Value::Int(0)]))
                .with_message("instanceof", "Pick a real day."),
        );
        let mut validator = AttributeValidator::default();
        property.prepare_validator(&mut validator);

        let names: Vec<&str> = validator.rule_specs().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["required", "maxlength", "in", "instanceof", "min"]);
        assert_eq!(property.messages()["instanceof"], "Pick a real day.");
    }
}

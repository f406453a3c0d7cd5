//! Per-class entity definitions.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::property::Property;
use super::schema::DefinitionSchema;
use crate::entity::Entity;
use crate::error::{Result, SchemaError};
use crate::hooks::HookDispatcher;
use crate::serializer::{RawSerializer, Serializer};
use crate::types::{DefaultProviders, TypeRegistry};
use crate::validation::{Validator, ValidatorFactory};
use crate::value::Value;

/// Locale used when nothing else is configured.
pub const DEFAULT_LOCALE: &str = "en";

/// Immutable schema of an entity class, shared by all of its entities.
pub struct Definition {
    schema: DefinitionSchema,
    properties: Vec<Property>,
    index: BTreeMap<String, usize>,
    default_locale: String,
    hooks: HookDispatcher,
    validator_factory: Option<ValidatorFactory>,
    serializer: Arc<dyn Serializer>,
}

impl Definition {
    /// Resolve a schema into a definition.
    ///
    /// Properties are ordered by `position`; properties without one keep
    /// their declaration order after the positioned ones.
    pub fn build(
        schema: DefinitionSchema,
        types: &TypeRegistry,
        providers: &DefaultProviders,
    ) -> std::result::Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut properties = Vec::with_capacity(schema.properties.len());
        for property in &schema.properties {
            let property = Property::build(&schema.class, property.clone(), types, providers)?;
            if !seen.insert(property.name().to_string()) {
                return Err(SchemaError::DuplicateProperty {
                    class: schema.class.clone(),
                    property: property.name().to_string(),
                });
            }
            properties.push(property);
        }
        properties.sort_by_key(|p| p.schema().position.unwrap_or(i64::MAX));

        let index = properties
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name().to_string(), i))
            .collect();

        Ok(Self {
            schema,
            properties,
            index,
            default_locale: DEFAULT_LOCALE.to_string(),
            hooks: HookDispatcher::default(),
            validator_factory: None,
            serializer: Arc::new(RawSerializer),
        })
    }

    /// Set the locale new entities start in.
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Set the hook dispatcher.
    pub fn with_hooks(mut self, hooks: HookDispatcher) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the validator factory.
    pub fn with_validator_factory(mut self, factory: Option<ValidatorFactory>) -> Self {
        self.validator_factory = factory;
        self
    }

    /// Set the serializer.
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Entity class identifier.
    pub fn class(&self) -> &str {
        &self.schema.class
    }

    /// Schema this definition was built from.
    pub fn schema(&self) -> &DefinitionSchema {
        &self.schema
    }

    /// Look up a property, case-insensitively.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.properties[i])
    }

    /// Whether the class declares `name`.
    pub fn has_property(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Properties in definition order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Property names in definition order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(Property::name)
    }

    /// Message overrides: attribute → rule → message.
    pub fn messages(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.schema.messages
    }

    /// Locale new entities start in.
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Hooks consulted by entities of this class.
    pub fn hooks(&self) -> &HookDispatcher {
        &self.hooks
    }

    /// Serializer used by entities of this class.
    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
    }

    /// A fresh validator from the configured factory.
    pub fn create_validator(&self) -> Validator {
        match &self.validator_factory {
            Some(factory) => factory(),
            None => Validator::new(),
        }
    }

    /// Create an entity with defaults loaded and `attrs` applied.
    pub fn make(
        self: &Arc<Self>,
        attrs: BTreeMap<String, Value>,
        locale: Option<&str>,
    ) -> Result<Entity> {
        Entity::with_attributes(Arc::clone(self), attrs, locale)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("class", &self.schema.class)
            .field("properties", &self.properties)
            .field("default_locale", &self.default_locale)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PropertySchema;

    fn build(schema: DefinitionSchema) -> std::result::Result<Definition, SchemaError> {
        Definition::build(schema, &TypeRegistry::default(), &DefaultProviders::default())
    }

    #[test]
    fn test_property_order() {
        let definition = build(
            DefinitionSchema::new("Article")
                .with_property(PropertySchema::generic("body"))
                .with_property(PropertySchema::generic("title").with_position(1))
                .with_property(PropertySchema::generic("id").with_position(0))
                .with_property(PropertySchema::generic("footer")),
        )
        .unwrap();

        let names: Vec<&str> = definition.property_names().collect();
        assert_eq!(names, ["id", "title", "body", "footer"]);
        assert!(definition.has_property("TITLE"));
        assert_eq!(definition.property("Body").unwrap().name(), "body");
        assert!(definition.property("missing").is_none());
    }

    #[test]
    fn test_duplicate_property() {
        let err = build(
            DefinitionSchema::new("Article")
                .with_property(PropertySchema::generic("title"))
                .with_property(PropertySchema::generic("Title")),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateProperty {
                class: "Article".into(),
                property: "title".into()
            }
        );
    }

    #[test]
    fn test_validator_factory() {
        let definition = build(DefinitionSchema::new("Article")).unwrap();
        assert!(definition.create_validator().parameter("factory").is_none());

        let factory: ValidatorFactory = Arc::new(|| {
            let mut validator = Validator::new();
            validator.set("factory", Value::Bool(true));
            validator
        });
        let definition = definition.with_validator_factory(Some(factory));
        assert_eq!(
            definition.create_validator().parameter("factory"),
            Some(&Value::Bool(true))
        );
        assert_eq!(definition.default_locale(), DEFAULT_LOCALE);
    }
}

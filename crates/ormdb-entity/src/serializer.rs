//! Entity snapshots.
//!
//! A [`Serializer`] turns an entity into a map of its schema properties, either
//! as raw [`Value`]s (what validation runs against) or as encoded JSON (what a
//! store or an API would keep). The `_i18n` variants replace each i18n
//! property with a locale → value map.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value as Json};

use crate::entity::Entity;
use crate::error::Result;
use crate::value::Value;

/// Reads entities into snapshots.
pub trait Serializer: Send + Sync + fmt::Debug {
    /// Property values in the active locale.
    fn to_array_raw(&self, entity: &Entity) -> BTreeMap<String, Value>;

    /// Encoded property values in the active locale.
    fn to_array(&self, entity: &Entity) -> Map<String, Json>;

    /// [`Serializer::to_array`] as JSON text.
    fn to_json(&self, entity: &Entity) -> Result<String> {
        Ok(serde_json::to_string(&self.to_array(entity))?)
    }

    /// Property values with i18n properties keyed by locale.
    ///
    /// An empty `locales` means every locale the entity holds.
    fn to_array_raw_i18n(&self, entity: &Entity, locales: &[String]) -> BTreeMap<String, Value>;

    /// Encoded property values with i18n properties keyed by locale.
    fn to_array_i18n(&self, entity: &Entity, locales: &[String]) -> Map<String, Json>;

    /// [`Serializer::to_array_i18n`] as JSON text.
    fn to_json_i18n(&self, entity: &Entity, locales: &[String]) -> Result<String> {
        Ok(serde_json::to_string(&self.to_array_i18n(entity, locales))?)
    }
}

/// Serializer reading schema properties through the soft get path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl RawSerializer {
    fn locales(entity: &Entity, locales: &[String]) -> Vec<String> {
        if locales.is_empty() {
            entity.locales()
        } else {
            locales.to_vec()
        }
    }
}

impl Serializer for RawSerializer {
    fn to_array_raw(&self, entity: &Entity) -> BTreeMap<String, Value> {
        entity
            .definition()
            .property_names()
            .map(|name| (name.to_string(), entity.get(name)))
            .collect()
    }

    fn to_array(&self, entity: &Entity) -> Map<String, Json> {
        entity
            .definition()
            .properties()
            .iter()
            .map(|property| {
                let value = entity.get(property.name());
                (property.name().to_string(), property.serialize(&value))
            })
            .collect()
    }

    fn to_array_raw_i18n(&self, entity: &Entity, locales: &[String]) -> BTreeMap<String, Value> {
        let locales = Self::locales(entity, locales);
        entity
            .definition()
            .properties()
            .iter()
            .map(|property| {
                let name = property.name();
                let value = if property.is_i18n() {
                    Value::Map(
                        locales
                            .iter()
                            .map(|locale| (locale.clone(), entity.get_in(name, locale)))
                            .collect(),
                    )
                } else {
                    entity.get(name)
                };
                (name.to_string(), value)
            })
            .collect()
    }

    fn to_array_i18n(&self, entity: &Entity, locales: &[String]) -> Map<String, Json> {
        let locales = Self::locales(entity, locales);
        entity
            .definition()
            .properties()
            .iter()
            .map(|property| {
                let name = property.name();
                let encoded = if property.is_i18n() {
                    Json::Object(
                        locales
                            .iter()
                            .map(|locale| {
                                let value = entity.get_in(name, locale);
                                (locale.clone(), property.serialize(&value))
                            })
                            .collect(),
                    )
                } else {
                    property.serialize(&entity.get(name))
                };
                (name.to_string(), encoded)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{Definition, DefinitionSchema, PropertySchema};
    use crate::entity::LocaleArg;

    fn article() -> Entity {
        let schema = DefinitionSchema::new("Article")
            .with_property(PropertySchema::integer("id"))
            .with_property(PropertySchema::generic("title").i18n())
            .with_property(PropertySchema::date("published_on"));
        let definition =
            Definition::build(schema, &Default::default(), &Default::default()).unwrap();
        Entity::new(Arc::new(definition))
    }

    #[test]
    fn test_raw_and_encoded() {
        let mut entity = article();
        entity.set("id", 3).unwrap();
        entity.set("title", "Hello").unwrap();
        entity.set("published_on", "2024-05-06").unwrap();

        let raw = RawSerializer.to_array_raw(&entity);
        assert_eq!(raw.len(), 3);
        assert_eq!(raw["title"], Value::from("Hello"));
        assert!(matches!(raw["published_on"], Value::Date(_)));

        let encoded = RawSerializer.to_array(&entity);
        assert_eq!(encoded["published_on"], Json::from("2024-05-06"));
        assert_eq!(
            RawSerializer.to_json(&entity).unwrap(),
            r#"{"id":3,"published_on":"2024-05-06","title":"Hello"}"#
        );
    }

    #[test]
    fn test_i18n_snapshot() {
        let mut entity = article();
        entity.set("title", "Hello").unwrap();
        entity
            .set_in("title", "Bonjour", LocaleArg::one("fr"))
            .unwrap();

        let raw = RawSerializer.to_array_raw_i18n(&entity, &[]);
        let title = raw["title"].as_map().unwrap();
        assert_eq!(title["en"], Value::from("Hello"));
        assert_eq!(title["fr"], Value::from("Bonjour"));
        assert_eq!(raw["id"], Value::Null);

        let only_fr = RawSerializer.to_array_i18n(&entity, &["fr".to_string()]);
        assert_eq!(only_fr["title"], serde_json::json!({"fr": "Bonjour"}));
    }
}

//! Property types.
//!
//! A property type decides how one attribute computes its zero value, coerces
//! incoming values, encodes to and decodes from the wire, and which validation
//! rules it adds. Types are looked up by tag in a [`TypeRegistry`], so schemas
//! only carry the tag and stay serializable.

mod defaults;
mod generic;
mod integer;
mod reference;
mod temporal;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::warn;

use crate::catalog::PropertySchema;
use crate::error::CoercionError;
use crate::validation::AttributeValidator;
use crate::value::Value;

pub use defaults::{DefaultProvider, DefaultProviders};
pub use generic::GenericType;
pub use integer::IntegerType;
pub use reference::EntityReferenceType;
pub use temporal::{DateType, DatetimeType, DATETIME_FORMAT, DATE_FORMAT};

/// Where a value is being coerced.
#[derive(Debug, Clone, Copy)]
pub struct CoercionContext<'a> {
    /// Class of the entity receiving the value.
    pub owner: &'a str,
    /// Schema of the property receiving the value.
    pub schema: &'a PropertySchema,
}

/// Behavior of one property type for a single (non-`many`) value.
///
/// `many` handling, explicit defaults and structural rules are shared and
/// live in [`crate::catalog::Property`].
pub trait PropertyType: Send + Sync + fmt::Debug {
    /// Registry tag, e.g. `"date"`.
    fn tag(&self) -> &str;

    /// Value used when no explicit default is configured.
    fn zero_value(&self) -> Value {
        Value::Null
    }

    /// Encode one value; `None` means the value has no encoding.
    fn encode(&self, value: &Value) -> Option<Json> {
        encode_generic(value)
    }

    /// Decode one stored value.
    fn decode(&self, raw: &Json) -> Value {
        decode_generic(raw)
    }

    /// Normalize a value written through the soft set path.
    fn coerce(&self, value: Value, _ctx: &CoercionContext<'_>) -> Result<Value, CoercionError> {
        Ok(value)
    }

    /// Add type-specific rules after the structural ones.
    fn contribute_validation(&self, _schema: &PropertySchema, _validator: &mut AttributeValidator) {}

    /// Default messages per rule name.
    fn messages(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Class that bare ids in a `many` collection refer to.
    fn collection_target(&self, _schema: &PropertySchema) -> Option<String> {
        None
    }
}

/// Scalars pass through, everything else uses the tagged serde form.
pub fn encode_generic(value: &Value) -> Option<Json> {
    match value {
        Value::Null => Some(Json::Null),
        Value::Bool(b) => Some(Json::Bool(*b)),
        Value::Int(i) => Some(Json::from(*i)),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number),
        Value::String(s) => Some(Json::String(s.clone())),
        other if has_non_finite(other) => {
            warn!(kind = other.type_name(), "value holds a non-finite float, no wire encoding");
            None
        }
        other => match serde_json::to_value(other) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, kind = other.type_name(), "value has no wire encoding");
                None
            }
        },
    }
}

fn has_non_finite(value: &Value) -> bool {
    match value {
        Value::Float(f) => !f.is_finite(),
        Value::List(items) => items.iter().any(has_non_finite),
        Value::Collection(collection) => collection.iter().any(has_non_finite),
        Value::Map(map) => map.values().any(has_non_finite),
        _ => false,
    }
}

/// Inverse of [`encode_generic`].
pub fn decode_generic(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(decode_generic).collect()),
        Json::Object(_) => match serde_json::from_value(raw.clone()) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "stored value could not be decoded");
                Value::Null
            }
        },
    }
}

/// Property types by tag.
#[derive(Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, Arc<dyn PropertyType>>,
}

impl TypeRegistry {
    /// A registry without any type.
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Register or replace a type under its tag.
    pub fn register(&mut self, property_type: impl PropertyType + 'static) -> &mut Self {
        let tag = property_type.tag().to_lowercase();
        self.types.insert(tag, Arc::new(property_type));
        self
    }

    /// Look up a type.
    pub fn get(&self, tag: &str) -> Option<Arc<dyn PropertyType>> {
        self.types.get(&tag.to_lowercase()).cloned()
    }

    /// Whether a tag is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(&tag.to_lowercase())
    }

    /// Registered tags.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(GenericType)
            .register(IntegerType)
            .register(DateType)
            .register(DatetimeType)
            .register(EntityReferenceType);
        registry
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.types.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EntityRef;

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(encode_generic(&Value::Int(3)), Some(Json::from(3)));
        assert_eq!(encode_generic(&Value::from("x")), Some(Json::from("x")));
        assert_eq!(encode_generic(&Value::Null), Some(Json::Null));
        assert_eq!(encode_generic(&Value::Float(f64::NAN)), None);
    }

    #[test]
    fn test_structured_values_round_trip() {
        let value = Value::from(vec![Value::Int(1), Value::Reference(EntityRef::new("User", 2))]);
        let encoded = encode_generic(&value).unwrap();
        assert!(encoded.is_object());

        let decoded = decode_generic(&encoded);
        assert_eq!(decoded, value);
        assert_eq!(encode_generic(&decoded), Some(encoded));
    }

    #[test]
    fn test_nested_non_finite_floats_have_no_encoding() {
        let list = Value::from(vec![Value::Int(1), Value::Float(f64::NAN)]);
        assert_eq!(encode_generic(&list), None);

        let mut map = std::collections::BTreeMap::new();
        map.insert("ratio".to_string(), Value::Float(f64::INFINITY));
        assert_eq!(encode_generic(&Value::Map(map)), None);

        let finite = Value::from(vec![Value::Float(0.5)]);
        assert_eq!(decode_generic(&encode_generic(&finite).unwrap()), finite);
    }

    #[test]
    fn test_registry_defaults() {
        let registry = TypeRegistry::default();
        for tag in ["generic", "integer", "date", "datetime", "entity"] {
            assert!(registry.contains(tag), "missing {}", tag);
        }
        assert!(registry.get("Date").is_some());
        assert!(registry.get("money").is_none());
    }
}

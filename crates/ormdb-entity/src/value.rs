//! Runtime attribute values.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::collection::ManyCollection;

/// A dynamically typed attribute value held by an entity.
///
/// Equality is structural, which is what the "same value is a no-op" write
/// rule compares with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    Datetime(NaiveDateTime),
    /// Plain list of values.
    List(Vec<Value>),
    /// String-keyed map of values.
    Map(BTreeMap<String, Value>),
    /// Lazily resolved reference to another entity.
    Reference(EntityRef),
    /// Multi-valued collection bound to an entity property.
    Collection(ManyCollection),
}

/// Identifier-only stub for an entity of another class.
///
/// Nothing is loaded until the caller resolves it through a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity class identifier.
    pub class: String,
    /// Identifier of the referenced entity.
    pub id: i64,
}

impl EntityRef {
    /// Create a new reference stub.
    pub fn new(class: impl Into<String>, id: i64) -> Self {
        Self {
            class: class.into(),
            id,
        }
    }
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, empty string, empty list, empty map or empty collection.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Collection(coll) => coll.is_empty(),
            _ => false,
        }
    }

    /// Scalars travel over the wire without encoding.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Lists and collections.
    pub fn is_list_like(&self) -> bool {
        matches!(self, Value::List(_) | Value::Collection(_))
    }

    /// Short type name used in messages and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Datetime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Reference(_) => "reference",
            Value::Collection(_) => "collection",
        }
    }

    /// The identity used for membership in a collection.
    ///
    /// A reference is identified by its `[class, id]` pair, every other value
    /// by itself.
    pub fn identity(&self) -> Value {
        match self {
            Value::Reference(r) => Value::List(vec![Value::String(r.class.clone()), Value::Int(r.id)]),
            other => other.clone(),
        }
    }

    /// Number of elements for list-like values, character count for strings.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Collection(coll) => Some(coll.len()),
            _ => None,
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as datetime.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Datetime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Try to get as list slice.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Try to get as entity reference.
    pub fn as_reference(&self) -> Option<&EntityRef> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Try to get as collection.
    pub fn as_collection(&self) -> Option<&ManyCollection> {
        match self {
            Value::Collection(coll) => Some(coll),
            _ => None,
        }
    }

    /// Elements of a list or collection.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            Value::Collection(coll) => Some(coll.as_slice()),
            _ => None,
        }
    }

    /// Look up a child by path segment: map key or list index.
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(segment),
            Value::List(_) | Value::Collection(_) => {
                let index: usize = segment.parse().ok()?;
                self.elements()?.get(index)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Datetime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Reference(r) => write!(f, "{}#{}", r.class, r.id),
            Value::List(items) => write_joined(f, items),
            Value::Collection(coll) => write_joined(f, coll.as_slice()),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Datetime(v)
    }
}

impl From<EntityRef> for Value {
    fn from(v: EntityRef) -> Self {
        Value::Reference(v)
    }
}

impl From<ManyCollection> for Value {
    fn from(v: ManyCollection) -> Self {
        Value::Collection(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Typed read access to a [`Value`].
pub trait FromValue: Sized {
    /// Convert, or `None` when the value has another shape.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_date()
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_datetime()
    }
}

impl FromValue for EntityRef {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_reference().cloned()
    }
}

impl FromValue for ManyCollection {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_collection().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::Bool(false).is_empty());
    }

    #[test]
    fn test_identity_of_reference_is_class_and_id() {
        let r = Value::Reference(EntityRef::new("Tag", 7));
        assert_eq!(r.identity(), Value::from(vec![Value::from("Tag"), Value::Int(7)]));
        assert_ne!(r.identity(), Value::Reference(EntityRef::new("Post", 7)).identity());
        assert_eq!(Value::from("a").identity(), Value::from("a"));
    }

    #[test]
    fn test_child_lookup() {
        let mut map = BTreeMap::new();
        map.insert("fr".to_string(), Value::from(vec!["a", "b"]));
        let value = Value::Map(map);

        let list = value.child("fr").unwrap();
        assert_eq!(list.child("1"), Some(&Value::from("b")));
        assert_eq!(list.child("2"), None);
        assert_eq!(value.child("en"), None);
    }

    #[test]
    fn test_json_shape_is_tagged() {
        let json = serde_json::to_value(Value::Reference(EntityRef::new("User", 3))).unwrap();
        assert_eq!(json["type"], "reference");
        assert_eq!(json["value"]["id"], 3);

        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Reference(EntityRef::new("User", 3)));
    }

    #[test]
    fn test_typed_access() {
        assert_eq!(i64::from_value(&Value::Int(4)), Some(4));
        assert_eq!(String::from_value(&Value::Int(4)), None);
        assert_eq!(f64::from_value(&Value::Int(4)), Some(4.0));
        assert_eq!(Value::from(Some(2)), Value::Int(2));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}

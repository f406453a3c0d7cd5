//! Entity reference property type.

use std::collections::BTreeMap;

use super::{CoercionContext, PropertyType};
use crate::catalog::PropertySchema;
use crate::error::CoercionError;
use crate::validation::AttributeValidator;
use crate::value::{EntityRef, Value};

/// Reference to an entity of one class (`entity`) or of one of several
/// classes (`entities`).
///
/// Values are [`EntityRef`] stubs; nothing is loaded on set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReferenceType;

impl EntityReferenceType {
    fn invalid(ctx: &CoercionContext<'_>, reason: impl Into<String>) -> CoercionError {
        CoercionError::InvalidReference {
            property: ctx.schema.name.clone(),
            reason: reason.into(),
        }
    }

    fn single(id: i64, ctx: &CoercionContext<'_>) -> Result<Value, CoercionError> {
        match &ctx.schema.entity {
            Some(class) => Ok(Value::Reference(EntityRef::new(class.clone(), id))),
            None => Err(Self::invalid(ctx, "a bare id needs a single target class")),
        }
    }

    fn pair(items: &[Value], ctx: &CoercionContext<'_>) -> Result<Value, CoercionError> {
        let Some(classes) = &ctx.schema.entities else {
            return Err(Self::invalid(ctx, "a [class, id] pair needs an entities list"));
        };
        let (class, id) = match items {
            [class, id] => (class.as_str(), id.as_i64().or_else(|| parse_id(id))),
            _ => (None, None),
        };
        match (class, id) {
            (Some(class), Some(id)) if classes.iter().any(|c| c == class) => {
                Ok(Value::Reference(EntityRef::new(class, id)))
            }
            (Some(class), Some(_)) => Err(Self::invalid(
                ctx,
                format!("{} is not one of {}", class, classes.join(", ")),
            )),
            _ => Err(Self::invalid(ctx, "expected a [class, id] pair")),
        }
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    value.as_str().and_then(|s| s.trim().parse().ok())
}

impl PropertyType for EntityReferenceType {
    fn tag(&self) -> &str {
        "entity"
    }

    fn coerce(&self, value: Value, ctx: &CoercionContext<'_>) -> Result<Value, CoercionError> {
        match value {
            Value::Null | Value::Reference(_) => Ok(value),
            Value::Int(id) => Self::single(id, ctx),
            Value::String(ref s) => match s.trim().parse::<i64>() {
                Ok(id) => Self::single(id, ctx),
                Err(_) => Err(Self::invalid(ctx, format!("'{}' is not an id", s))),
            },
            Value::List(ref items) => Self::pair(items, ctx),
            other => Err(Self::invalid(
                ctx,
                format!("cannot reference from a {}", other.type_name()),
            )),
        }
    }

    fn contribute_validation(&self, schema: &PropertySchema, validator: &mut AttributeValidator) {
        if let Some(class) = &schema.entity {
            validator.rule("instanceof", vec![Value::from(class.as_str())]);
        } else if let Some(classes) = &schema.entities {
            validator.rule(
                "instanceof",
                classes.iter().map(|c| Value::from(c.as_str())).collect(),
            );
        }
    }

    fn messages(&self) -> BTreeMap<String, String> {
        let mut messages = BTreeMap::new();
        messages.insert(
            "instanceof".into(),
            ":attribute must reference a :kind.".into(),
        );
        messages
    }

    fn collection_target(&self, schema: &PropertySchema) -> Option<String> {
        schema.entity.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coerce(schema: &PropertySchema, value: Value) -> Result<Value, CoercionError> {
        EntityReferenceType.coerce(
            value,
            &CoercionContext {
                owner: "Article",
                schema,
            },
        )
    }

    #[test]
    fn test_bare_id_becomes_reference() {
        let schema = PropertySchema::reference("author", "User");
        assert_eq!(
            coerce(&schema, Value::Int(7)).unwrap(),
            Value::Reference(EntityRef::new("User", 7))
        );
        assert_eq!(
            coerce(&schema, Value::from("12")).unwrap(),
            Value::Reference(EntityRef::new("User", 12))
        );
        assert_eq!(coerce(&schema, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_pair_needs_listed_class() {
        let schema = PropertySchema::polymorphic_reference("subject", ["Post", "Comment"]);
        let pair = Value::from(vec![Value::from("Comment"), Value::Int(3)]);
        assert_eq!(
            coerce(&schema, pair).unwrap(),
            Value::Reference(EntityRef::new("Comment", 3))
        );

        let foreign = Value::from(vec![Value::from("User"), Value::Int(3)]);
        assert!(matches!(
            coerce(&schema, foreign),
            Err(CoercionError::InvalidReference { .. })
        ));
        assert!(coerce(&schema, Value::Int(3)).is_err());
    }

    #[test]
    fn test_rejects_other_shapes() {
        let schema = PropertySchema::reference("author", "User");
        assert!(coerce(&schema, Value::Bool(true)).is_err());
        assert!(coerce(&schema, Value::from("alice")).is_err());
    }

    #[test]
    fn test_validation_lists_classes() {
        let schema = PropertySchema::polymorphic_reference("subject", ["Post", "Comment"]);
        let mut validator = AttributeValidator::default();
        EntityReferenceType.contribute_validation(&schema, &mut validator);
        let spec = &validator.rule_specs()[0];
        assert_eq!(spec.name, "instanceof");
        assert_eq!(spec.params, vec![Value::from("Post"), Value::from("Comment")]);
    }
}

//! Integer property type.

use super::{CoercionContext, PropertyType};
use crate::catalog::PropertySchema;
use crate::error::CoercionError;
use crate::validation::AttributeValidator;
use crate::value::Value;

/// Whole numbers; numeric strings and integral floats are normalized.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl PropertyType for IntegerType {
    fn tag(&self) -> &str {
        "integer"
    }

    fn coerce(&self, value: Value, _ctx: &CoercionContext<'_>) -> Result<Value, CoercionError> {
        match value {
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::Int(f as i64)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                trimmed
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| CoercionError::InvalidInteger(s.clone()))
            }
            other => Ok(other),
        }
    }

    fn contribute_validation(&self, _schema: &PropertySchema, validator: &mut AttributeValidator) {
        validator.rule("integer", vec![]);
    }
}

//! Date and datetime property types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as Json;
use tracing::warn;

use super::{decode_generic, encode_generic, CoercionContext, PropertyType};
use crate::catalog::PropertySchema;
use crate::error::CoercionError;
use crate::validation::AttributeValidator;
use crate::value::Value;

/// Wire and input format for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wire and input format for datetimes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Calendar dates, stored as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl PropertyType for DateType {
    fn tag(&self) -> &str {
        "date"
    }

    fn encode(&self, value: &Value) -> Option<Json> {
        match value {
            Value::Date(d) => Some(Json::String(d.format(DATE_FORMAT).to_string())),
            other => encode_generic(other),
        }
    }

    fn decode(&self, raw: &Json) -> Value {
        match raw {
            Json::String(s) if s.is_empty() => Value::Null,
            Json::String(s) => match NaiveDate::parse_from_str(s, DATE_FORMAT) {
                Ok(d) => Value::Date(d),
                Err(e) => {
                    warn!(error = %e, raw = %s, "stored date does not parse");
                    Value::String(s.clone())
                }
            },
            other => decode_generic(other),
        }
    }

    fn coerce(&self, value: Value, _ctx: &CoercionContext<'_>) -> Result<Value, CoercionError> {
        match value {
            Value::Datetime(dt) => Ok(Value::Date(dt.date())),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map(Value::Date)
                .map_err(|_| CoercionError::InvalidDate {
                    value: s,
                    format: DATE_FORMAT,
                }),
            other => Ok(other),
        }
    }

    fn contribute_validation(&self, _schema: &PropertySchema, validator: &mut AttributeValidator) {
        validator.rule("instanceof", vec![Value::from("date")]);
    }

    fn messages(&self) -> BTreeMap<String, String> {
        let mut messages = BTreeMap::new();
        messages.insert("instanceof".into(), ":attribute must be a valid date.".into());
        messages
    }
}

/// Date and time, stored as `YYYY-MM-DD HH:MM:SS`.
///
/// Null encodes as an empty string. A string that does not parse on set is
/// kept verbatim so validation can report it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatetimeType;

impl DatetimeType {
    fn parse(s: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
    }
}

impl PropertyType for DatetimeType {
    fn tag(&self) -> &str {
        "datetime"
    }

    fn encode(&self, value: &Value) -> Option<Json> {
        match value {
            Value::Null => Some(Json::String(String::new())),
            Value::Datetime(dt) => Some(Json::String(dt.format(DATETIME_FORMAT).to_string())),
            other => encode_generic(other),
        }
    }

    fn decode(&self, raw: &Json) -> Value {
        match raw {
            Json::String(s) if s.is_empty() => Value::Null,
            Json::String(s) => match Self::parse(s) {
                Some(dt) => Value::Datetime(dt),
                None => {
                    warn!(raw = %s, "stored datetime does not parse");
                    Value::String(s.clone())
                }
            },
            other => decode_generic(other),
        }
    }

    fn coerce(&self, value: Value, _ctx: &CoercionContext<'_>) -> Result<Value, CoercionError> {
        match value {
            Value::Date(d) => Ok(Value::Datetime(d.and_time(NaiveTime::MIN))),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => Ok(Self::parse(s.trim())
                .map(Value::Datetime)
                .unwrap_or(Value::String(s))),
            other => Ok(other),
        }
    }

    fn contribute_validation(&self, _schema: &PropertySchema, validator: &mut AttributeValidator) {
        validator.rule("instanceof", vec![Value::from("datetime")]);
    }

    fn messages(&self) -> BTreeMap<String, String> {
        let mut messages = BTreeMap::new();
        messages.insert(
            "instanceof".into(),
            ":attribute must be a valid datetime.".into(),
        );
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_schema() -> PropertySchema {
        PropertySchema::date("published_on")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_coerce() {
        let schema = ctx_schema();
        let ctx = CoercionContext {
            owner: "Article",
            schema: &schema,
        };
        assert_eq!(
            DateType.coerce(Value::from("2024-02-29"), &ctx).unwrap(),
            Value::Date(date(2024, 2, 29))
        );
        assert!(matches!(
            DateType.coerce(Value::from("29/02/2024"), &ctx),
            Err(CoercionError::InvalidDate { .. })
        ));
        assert_eq!(DateType.coerce(Value::Int(5), &ctx).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_date_wire_format() {
        let encoded = DateType.encode(&Value::Date(date(2023, 7, 1))).unwrap();
        assert_eq!(encoded, Json::from("2023-07-01"));
        assert_eq!(DateType.decode(&encoded), Value::Date(date(2023, 7, 1)));
        assert_eq!(DateType.encode(&Value::Null), Some(Json::Null));
        assert_eq!(DateType.decode(&Json::Null), Value::Null);
    }

    #[test]
    fn test_datetime_null_is_empty_string() {
        assert_eq!(DatetimeType.encode(&Value::Null), Some(Json::from("")));
        assert_eq!(DatetimeType.decode(&Json::from("")), Value::Null);
    }

    #[test]
    fn test_datetime_coerce_keeps_garbage() {
        let schema = PropertySchema::datetime("created_at");
        let ctx = CoercionContext {
            owner: "Article",
            schema: &schema,
        };
        let parsed = DatetimeType
            .coerce(Value::from("2024-01-02 03:04:05"), &ctx)
            .unwrap();
        assert_eq!(
            parsed,
            Value::Datetime(date(2024, 1, 2).and_hms_opt(3, 4, 5).unwrap())
        );

        let rfc = DatetimeType
            .coerce(Value::from("2024-01-02T03:04:05Z"), &ctx)
            .unwrap();
        assert_eq!(rfc, parsed);

        assert_eq!(
            DatetimeType.coerce(Value::from("soon"), &ctx).unwrap(),
            Value::from("soon")
        );
    }

    #[test]
    fn test_datetime_round_trip() {
        let value = Value::Datetime(date(2022, 12, 31).and_hms_opt(23, 59, 0).unwrap());
        let encoded = DatetimeType.encode(&value).unwrap();
        assert_eq!(encoded, Json::from("2022-12-31 23:59:00"));
        assert_eq!(DatetimeType.decode(&encoded), value);
    }
}

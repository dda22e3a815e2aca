//! Leaf (scalar / enum) types
//!
//! A leaf's type decides which JSON values it accepts, how they are normalized
//! before reaching the connector, and whether the ordering operators
//! (`gt`, `gte`, `lt`, `lte`) apply to it.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Type of a leaf component
///
/// Serialized as a lower-case string (`"string"`, `"int"`, ...) except for
/// enums, which carry their allowed values: `{"enum": ["DRAFT", "PUBLISHED"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafType {
    String,
    NonEmptyString,
    Int,
    Float,
    Boolean,
    Uuid,
    DateTime,
    Date,
    Json,
    Enum(Vec<String>),
}

impl LeafType {
    /// Short type name used in input shapes and error messages
    pub fn name(&self) -> &'static str {
        match self {
            LeafType::String => "string",
            LeafType::NonEmptyString => "non_empty_string",
            LeafType::Int => "int",
            LeafType::Float => "float",
            LeafType::Boolean => "boolean",
            LeafType::Uuid => "uuid",
            LeafType::DateTime => "date_time",
            LeafType::Date => "date",
            LeafType::Json => "json",
            LeafType::Enum(_) => "enum",
        }
    }

    /// Whether `gt`/`gte`/`lt`/`lte` and sorting make sense for this type
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            LeafType::String
                | LeafType::NonEmptyString
                | LeafType::Int
                | LeafType::Float
                | LeafType::DateTime
                | LeafType::Date
        )
    }

    /// Validate and normalize a non-null value
    ///
    /// Null handling is the caller's business (it depends on the leaf's
    /// nullability), so `null` is rejected here like any other mismatch.
    pub fn parse(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (LeafType::Json, value) => Ok(value.clone()),
            (LeafType::String, Value::String(s)) => Ok(Value::String(s.clone())),
            (LeafType::NonEmptyString, Value::String(s)) => {
                if s.trim().is_empty() {
                    Err("expected a non-empty string".to_string())
                } else {
                    Ok(Value::String(s.clone()))
                }
            }
            (LeafType::Int, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::from(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(format!("expected an integer, got {}", n)),
                }
            }
            (LeafType::Float, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected a finite number, got {}", n)),
            (LeafType::Boolean, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (LeafType::Uuid, Value::String(s)) => uuid::Uuid::parse_str(s)
                .map(|id| Value::String(id.hyphenated().to_string()))
                .map_err(|_| format!("expected a UUID, got \"{}\"", s)),
            (LeafType::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| {
                    Value::String(
                        dt.with_timezone(&Utc)
                            .to_rfc3339_opts(SecondsFormat::Millis, true),
                    )
                })
                .map_err(|_| format!("expected an RFC 3339 date-time, got \"{}\"", s)),
            (LeafType::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .map_err(|_| format!("expected a YYYY-MM-DD date, got \"{}\"", s)),
            (LeafType::Enum(values), Value::String(s)) => {
                if values.iter().any(|v| v == s) {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!(
                        "expected one of [{}], got \"{}\"",
                        values.join(", "),
                        s
                    ))
                }
            }
            (leaf_type, other) => Err(format!(
                "expected a value of type \"{}\", got {}",
                leaf_type.name(),
                super::error::json_kind(other)
            )),
        }
    }

    /// Compare two already-parsed values of this type
    ///
    /// Returns `None` when the values are not comparable (mixed kinds, nulls,
    /// non-orderable payloads).
    pub fn compare(&self, a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                    Some(x.cmp(&y))
                } else {
                    x.as_f64()?.partial_cmp(&y.as_f64()?)
                }
            }
            // Date-times are normalized to UTC RFC 3339 with fixed precision,
            // so lexical order is chronological order.
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_normalizes_values() {
        assert_eq!(LeafType::Int.parse(&json!(5.0)).unwrap(), json!(5));
        assert_eq!(LeafType::Float.parse(&json!(2)).unwrap(), json!(2.0));
        assert_eq!(
            LeafType::Uuid
                .parse(&json!("6BA7B810-9DAD-11D1-80B4-00C04FD430C8"))
                .unwrap(),
            json!("6ba7b810-9dad-11d1-80b4-00c04fd430c8")
        );
        assert_eq!(
            LeafType::DateTime
                .parse(&json!("2024-03-01T10:00:00+02:00"))
                .unwrap(),
            json!("2024-03-01T08:00:00.000Z")
        );
    }

    #[test]
    fn test_parse_rejects_mismatches() {
        assert!(LeafType::Int.parse(&json!(1.5)).is_err());
        assert!(LeafType::String.parse(&json!(1)).is_err());
        assert!(LeafType::NonEmptyString.parse(&json!("   ")).is_err());
        assert!(LeafType::Date.parse(&json!("2024-13-01")).is_err());
        assert!(LeafType::Boolean.parse(&Value::Null).is_err());

        let status = LeafType::Enum(vec!["DRAFT".to_string(), "PUBLISHED".to_string()]);
        assert!(status.parse(&json!("DRAFT")).is_ok());
        assert!(status.parse(&json!("ARCHIVED")).is_err());
    }

    #[test]
    fn test_compare_and_orderability() {
        assert_eq!(
            LeafType::Int.compare(&json!(1), &json!(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            LeafType::Float.compare(&json!(2.5), &json!(2.5)),
            Some(Ordering::Equal)
        );
        assert_eq!(LeafType::Int.compare(&json!(1), &Value::Null), None);
        assert!(LeafType::Date.is_orderable());
        assert!(!LeafType::Boolean.is_orderable());
        assert!(!LeafType::Enum(vec![]).is_orderable());
    }

    #[test]
    fn test_serde_representation() {
        assert_eq!(serde_json::to_value(LeafType::DateTime).unwrap(), json!("date_time"));
        let parsed: LeafType = serde_json::from_value(json!({"enum": ["A", "B"]})).unwrap();
        assert_eq!(parsed, LeafType::Enum(vec!["A".to_string(), "B".to_string()]));
    }
}

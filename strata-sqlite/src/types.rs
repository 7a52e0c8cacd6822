//! Conversions between filter values and SQLite values.

use rusqlite::types::{Value, ValueRef};
use strata_query::FilterValue;

use crate::error::{SqliteError, SqliteResult};

/// Convert a bound argument to a SQLite value.
///
/// Booleans are stored as 0/1 and JSON as text. Lists only appear expanded
/// into `IN (...)` placeholders, so a list argument is an error.
pub fn filter_value_to_sqlite(value: &FilterValue) -> SqliteResult<Value> {
    Ok(match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
        FilterValue::Json(j) => Value::Text(j.to_string()),
        FilterValue::List(_) => {
            return Err(SqliteError::type_conversion("list values cannot be bound as a single parameter"));
        }
    })
}

/// Convert a SQLite column value to a filter value.
pub fn from_sqlite_value(value: ValueRef<'_>) -> FilterValue {
    match value {
        ValueRef::Null => FilterValue::Null,
        ValueRef::Integer(i) => FilterValue::Int(i),
        ValueRef::Real(f) => FilterValue::Float(f),
        ValueRef::Text(bytes) => FilterValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => FilterValue::String(s.to_string()),
            Err(_) => FilterValue::List(bytes.iter().map(|b| FilterValue::Int(i64::from(*b))).collect()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_value_to_sqlite() {
        assert_eq!(filter_value_to_sqlite(&FilterValue::Null).unwrap(), Value::Null);
        assert_eq!(filter_value_to_sqlite(&FilterValue::Bool(true)).unwrap(), Value::Integer(1));
        assert_eq!(filter_value_to_sqlite(&FilterValue::Int(42)).unwrap(), Value::Integer(42));
        assert_eq!(
            filter_value_to_sqlite(&FilterValue::from("hello")).unwrap(),
            Value::Text("hello".to_string())
        );
        assert_eq!(
            filter_value_to_sqlite(&FilterValue::Json(serde_json::json!({"a": 1}))).unwrap(),
            Value::Text(r#"{"a":1}"#.to_string())
        );
        assert!(filter_value_to_sqlite(&FilterValue::List(vec![FilterValue::Int(1)])).is_err());
    }

    #[test]
    fn test_from_sqlite_value() {
        assert_eq!(from_sqlite_value(ValueRef::Null), FilterValue::Null);
        assert_eq!(from_sqlite_value(ValueRef::Integer(7)), FilterValue::Int(7));
        assert_eq!(from_sqlite_value(ValueRef::Real(1.5)), FilterValue::Float(1.5));
        assert_eq!(from_sqlite_value(ValueRef::Text(b"abc")), FilterValue::from("abc"));
        assert_eq!(
            from_sqlite_value(ValueRef::Blob(&[0xff, 0x00])),
            FilterValue::List(vec![FilterValue::Int(255), FilterValue::Int(0)])
        );
    }
}

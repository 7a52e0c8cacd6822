//! Values and filters for building WHERE clauses.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A value bound as a statement argument or stored in a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value.
    Json(serde_json::Value),
    /// List of values.
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// A hashable form used to match and deduplicate key values.
    pub fn key(&self) -> ValueKey {
        match self {
            Self::Null => ValueKey::Null,
            Self::Bool(v) => ValueKey::Bool(*v),
            Self::Int(v) => ValueKey::Int(*v),
            Self::Float(v) => ValueKey::Float(v.to_bits()),
            Self::String(v) => ValueKey::String(v.clone()),
            Self::Json(v) => ValueKey::Json(v.to_string()),
            Self::List(v) => ValueKey::List(v.iter().map(FilterValue::key).collect()),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "'{v}'"),
            Self::Json(v) => write!(f, "{v}"),
            Self::List(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Hashable identity of a [`FilterValue`].
///
/// Floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Json(String),
    List(Vec<ValueKey>),
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A column, optionally qualified by its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table name, when qualified.
    pub table: Option<SmolStr>,
    /// Column name.
    pub column: SmolStr,
}

impl ColumnRef {
    /// An unqualified column.
    pub fn new(column: impl Into<SmolStr>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// A table-qualified column.
    pub fn qualified(table: impl Into<SmolStr>, column: impl Into<SmolStr>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    fn qualify(&mut self, table: &str) {
        if self.table.is_none() {
            self.table = Some(SmolStr::new(table));
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(column: &str) -> Self {
        Self::new(column)
    }
}

/// A WHERE-clause condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter.
    #[default]
    None,
    /// Equals; a null value renders as `IS NULL`.
    Equals(ColumnRef, FilterValue),
    /// Not equals.
    NotEquals(ColumnRef, FilterValue),
    /// Less than.
    Lt(ColumnRef, FilterValue),
    /// Less than or equal.
    Lte(ColumnRef, FilterValue),
    /// Greater than.
    Gt(ColumnRef, FilterValue),
    /// Greater than or equal.
    Gte(ColumnRef, FilterValue),
    /// In a list of values.
    In(ColumnRef, Vec<FilterValue>),
    /// Not in a list of values.
    NotIn(ColumnRef, Vec<FilterValue>),
    /// Is null.
    IsNull(ColumnRef),
    /// Is not null.
    IsNotNull(ColumnRef),
    /// All conditions hold.
    And(Vec<Filter>),
    /// Any condition holds.
    Or(Vec<Filter>),
    /// Negation.
    Not(Box<Filter>),
}

impl Filter {
    /// `column = value`.
    pub fn equals(column: impl Into<ColumnRef>, value: impl Into<FilterValue>) -> Self {
        Self::Equals(column.into(), value.into())
    }

    /// Match a set of key values: `= ?` for a single key, `IN (...)` otherwise.
    pub fn keys(column: impl Into<ColumnRef>, mut keys: Vec<FilterValue>) -> Self {
        let column = column.into();
        if keys.len() == 1 {
            if let Some(key) = keys.pop() {
                return Self::Equals(column, key);
            }
        }
        Self::In(column, keys)
    }

    /// Check if this is an empty filter.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        match (self, other) {
            (Self::None, f) | (f, Self::None) => f,
            (Self::And(mut filters), Self::And(more)) => {
                filters.extend(more);
                Self::And(filters)
            }
            (Self::And(mut filters), f) => {
                filters.push(f);
                Self::And(filters)
            }
            (f, Self::And(mut filters)) => {
                filters.insert(0, f);
                Self::And(filters)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Combine with another filter using OR.
    pub fn or_else(self, other: Filter) -> Self {
        match (self, other) {
            (Self::None, f) | (f, Self::None) => f,
            (Self::Or(mut filters), f) => {
                filters.push(f);
                Self::Or(filters)
            }
            (a, b) => Self::Or(vec![a, b]),
        }
    }

    /// Negate this filter.
    pub fn negate(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Not(inner) => *inner,
            f => Self::Not(Box::new(f)),
        }
    }

    /// Qualify every unqualified column with `table`.
    pub fn qualify(&mut self, table: &str) {
        match self {
            Self::None => {}
            Self::Equals(c, _)
            | Self::NotEquals(c, _)
            | Self::Lt(c, _)
            | Self::Lte(c, _)
            | Self::Gt(c, _)
            | Self::Gte(c, _)
            | Self::In(c, _)
            | Self::NotIn(c, _)
            | Self::IsNull(c)
            | Self::IsNotNull(c) => c.qualify(table),
            Self::And(filters) | Self::Or(filters) => {
                for f in filters {
                    f.qualify(table);
                }
            }
            Self::Not(inner) => inner.qualify(table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_value_from() {
        assert_eq!(FilterValue::from(42i32), FilterValue::Int(42));
        assert_eq!(FilterValue::from("x"), FilterValue::String("x".to_string()));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
        assert_eq!(
            FilterValue::from(vec![1i64, 2]),
            FilterValue::List(vec![FilterValue::Int(1), FilterValue::Int(2)])
        );
    }

    #[test]
    fn test_value_key_distinguishes_types() {
        assert_eq!(FilterValue::Int(1).key(), FilterValue::Int(1).key());
        assert_ne!(FilterValue::Int(1).key(), FilterValue::String("1".into()).key());
        assert_eq!(FilterValue::Float(1.5).key(), ValueKey::Float(1.5f64.to_bits()));
    }

    #[test]
    fn test_keys_filter() {
        assert_eq!(
            Filter::keys("site_id", vec![FilterValue::Int(41)]),
            Filter::Equals(ColumnRef::new("site_id"), FilterValue::Int(41))
        );
        assert!(matches!(
            Filter::keys("site_id", vec![FilterValue::Int(1), FilterValue::Int(2)]),
            Filter::In(_, ref keys) if keys.len() == 2
        ));
    }

    #[test]
    fn test_and_then_flattens() {
        let f = Filter::equals("a", 1)
            .and_then(Filter::None)
            .and_then(Filter::equals("b", 2))
            .and_then(Filter::equals("c", 3));
        match f {
            Filter::And(filters) => assert_eq!(filters.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_negate_twice() {
        let f = Filter::equals("a", 1);
        assert_eq!(f.clone().negate().negate(), f);
    }

    #[test]
    fn test_qualify_keeps_existing_tables() {
        let mut f = Filter::equals("id", 1).and_then(Filter::Equals(
            ColumnRef::qualified("authors", "id"),
            FilterValue::Int(7),
        ));
        f.qualify("articles");
        assert_eq!(
            f,
            Filter::And(vec![
                Filter::Equals(ColumnRef::qualified("articles", "id"), FilterValue::Int(1)),
                Filter::Equals(ColumnRef::qualified("authors", "id"), FilterValue::Int(7)),
            ])
        );
    }
}

//! The database adapter seam.

use async_trait::async_trait;
use indexmap::IndexMap;
use smol_str::SmolStr;
use strata_schema::DatabaseProvider;

use crate::error::QueryResult;
use crate::filter::FilterValue;

/// A result row, keyed by column name in select order.
pub type Row = IndexMap<SmolStr, FilterValue>;

/// What an adapter returns for one executed statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecuteResult {
    /// Returned rows.
    pub rows: Vec<Row>,
    /// Column names of the result set.
    pub fields: Vec<SmolStr>,
    /// Primary key generated by an INSERT, if any.
    pub inserted_id: Option<FilterValue>,
}

impl ExecuteResult {
    /// A result holding `rows`; fields are taken from the first row.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let fields = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            rows,
            fields,
            inserted_id: None,
        }
    }

    /// Set the generated primary key.
    pub fn with_inserted_id(mut self, id: impl Into<FilterValue>) -> Self {
        self.inserted_id = Some(id.into());
        self
    }
}

/// Executes SQL against a database.
///
/// Driver failures must be reported as adapter errors
/// ([`QueryError::adapter`](crate::QueryError::adapter)) wrapping the
/// original cause.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Execute one statement with positional arguments.
    async fn execute(&self, sql: &str, args: &[FilterValue]) -> QueryResult<ExecuteResult>;

    /// The dialect this adapter speaks.
    fn provider(&self) -> DatabaseProvider {
        DatabaseProvider::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_fields() {
        let mut row = Row::new();
        row.insert("id".into(), FilterValue::Int(1));
        row.insert("name".into(), FilterValue::from("a"));
        let result = ExecuteResult::from_rows(vec![row]).with_inserted_id(1);
        assert_eq!(result.fields, vec![SmolStr::new("id"), SmolStr::new("name")]);
        assert_eq!(result.inserted_id, Some(FilterValue::Int(1)));
        assert!(ExecuteResult::from_rows(Vec::new()).fields.is_empty());
    }
}

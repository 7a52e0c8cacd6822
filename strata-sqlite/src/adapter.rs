//! The SQLite adapter.

use async_trait::async_trait;
use rusqlite::params_from_iter;
use smol_str::SmolStr;
use strata_query::{Adapter, ExecuteResult, FilterValue, QueryResult, Row};
use strata_schema::DatabaseProvider;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::SqliteResult;
use crate::types::{filter_value_to_sqlite, from_sqlite_value};

/// An [`Adapter`] over one SQLite connection.
///
/// Statements run on the connection's background thread in submission
/// order. INSERTs report `last_insert_rowid` as the inserted id.
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use strata_query::Database;
/// use strata_sqlite::SqliteAdapter;
///
/// let adapter = SqliteAdapter::memory().await?;
/// adapter.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT)").await?;
/// let db = Database::new(Arc::new(adapter));
/// ```
#[derive(Clone)]
pub struct SqliteAdapter {
    conn: Connection,
    config: SqliteConfig,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteAdapter {
    /// Open a connection and apply the configured pragmas.
    pub async fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await?,
            DatabasePath::File(path) => Connection::open(path).await?,
        };

        let init_sql = config.init_sql();
        conn.call(move |conn| {
            conn.execute_batch(&init_sql)?;
            Ok(())
        })
        .await?;

        info!(path = ?config.path, "SQLite connection opened");
        Ok(Self { conn, config })
    }

    /// Open an in-memory database.
    pub async fn memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory()).await
    }

    /// Open the database a URL points at.
    pub async fn connect(url: &str) -> SqliteResult<Self> {
        Self::open(SqliteConfig::from_url(url)?).await
    }

    /// The configuration the connection was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Run several `;`-separated statements without parameters.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn run(&self, sql: &str, args: &[FilterValue]) -> SqliteResult<ExecuteResult> {
        let params = args
            .iter()
            .map(filter_value_to_sqlite)
            .collect::<SqliteResult<Vec<_>>>()?;
        let sql = sql.to_string();
        let is_insert = sql.trim_start().get(..6).is_some_and(|s| s.eq_ignore_ascii_case("insert"));

        let result = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let fields: Vec<SmolStr> = stmt.column_names().into_iter().map(SmolStr::new).collect();

                if fields.is_empty() {
                    let changed = stmt.execute(params_from_iter(params.iter()))?;
                    let mut result = ExecuteResult::default();
                    if is_insert && changed > 0 {
                        result = result.with_inserted_id(conn.last_insert_rowid());
                    }
                    return Ok(result);
                }

                let mut rows = Vec::new();
                let mut cursor = stmt.query(params_from_iter(params.iter()))?;
                while let Some(row) = cursor.next()? {
                    let mut record = Row::new();
                    for (index, field) in fields.iter().enumerate() {
                        record.insert(field.clone(), from_sqlite_value(row.get_ref(index)?));
                    }
                    rows.push(record);
                }
                Ok(ExecuteResult {
                    rows,
                    fields,
                    inserted_id: None,
                })
            })
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    async fn execute(&self, sql: &str, args: &[FilterValue]) -> QueryResult<ExecuteResult> {
        Ok(self.run(sql, args).await?)
    }

    fn provider(&self) -> DatabaseProvider {
        DatabaseProvider::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_insert_reports_rowid() {
        let adapter = SqliteAdapter::memory().await.unwrap();
        adapter
            .execute_batch("CREATE TABLE sites (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();

        let result = adapter
            .execute(r#"INSERT INTO "sites" ("name") VALUES (?)"#, &["azuljs.com".into()])
            .await
            .unwrap();
        assert_eq!(result.inserted_id, Some(FilterValue::Int(1)));

        let result = adapter
            .execute(r#"SELECT * FROM "sites" WHERE "id" = ?"#, &[1.into()])
            .await
            .unwrap();
        assert_eq!(result.fields, vec![SmolStr::new("id"), SmolStr::new("name")]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["name"], FilterValue::from("azuljs.com"));
    }

    #[tokio::test]
    async fn test_update_has_no_inserted_id() {
        let adapter = SqliteAdapter::memory().await.unwrap();
        adapter
            .execute_batch("CREATE TABLE sites (id INTEGER PRIMARY KEY, name TEXT); INSERT INTO sites (name) VALUES ('a');")
            .await
            .unwrap();
        let result = adapter
            .execute(r#"UPDATE "sites" SET "name" = ? WHERE "id" = ?"#, &["b".into(), 1.into()])
            .await
            .unwrap();
        assert_eq!(result, ExecuteResult::default());
    }

    #[tokio::test]
    async fn test_errors_are_adapter_errors() {
        let adapter = SqliteAdapter::memory().await.unwrap();
        let err = adapter.execute(r#"SELECT * FROM "missing""#, &[]).await.unwrap_err();
        assert!(err.is_adapter());
        assert!(err.to_string().contains("no such table"));
    }
}

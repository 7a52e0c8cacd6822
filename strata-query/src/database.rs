//! The database handle.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use smol_str::SmolStr;
use strata_schema::inflection::pascal_case;
use strata_schema::{Catalog, RelationRef, SchemaResult, StrataConfig};
use tracing::{debug, info};

use crate::adapter::{Adapter, ExecuteResult, Row};
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::query::ModelQuery;
use crate::record::Record;
use crate::relations::{JoinPath, RelationHandle};
use crate::sql::{Grammar, Statement};

/// Ties a [`Catalog`] of models to an [`Adapter`].
///
/// Relation configuration is resolved lazily under a write lock that is
/// never held across an `.await`.
///
/// ```rust
/// use std::sync::Arc;
/// use strata_query::{Database, testing::ScriptedAdapter};
/// use strata_schema::RelationOptions;
///
/// let db = Database::new(Arc::new(ScriptedAdapter::new()));
/// db.declare(|catalog| {
///     catalog.model("comment").field("body");
///     catalog.model("article").has_many("comments", RelationOptions::new())?;
///     Ok(())
/// })?;
/// let statement = db.query("comment")?.where_eq("articleId", 9)?.statement();
/// assert_eq!(statement.sql, r#"SELECT * FROM "comments" WHERE "article_id" = ?"#);
/// # Ok::<(), strata_query::QueryError>(())
/// ```
pub struct Database {
    catalog: RwLock<Catalog>,
    adapter: Arc<dyn Adapter>,
    grammar: Grammar,
    log_queries: bool,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("grammar", &self.grammar)
            .field("log_queries", &self.log_queries)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Create a database with an empty catalog.
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self::with_catalog(adapter, Catalog::new())
    }

    /// Create a database over an existing catalog.
    pub fn with_catalog(adapter: Arc<dyn Adapter>, catalog: Catalog) -> Self {
        let grammar = Grammar::new(adapter.provider());
        Self {
            catalog: RwLock::new(catalog),
            adapter,
            grammar,
            log_queries: false,
        }
    }

    /// Create a database from a loaded `strata.toml`.
    ///
    /// The catalog uses the configured naming, the grammar the configured
    /// provider.
    pub fn from_config(config: &StrataConfig, adapter: Arc<dyn Adapter>) -> Self {
        Self {
            catalog: RwLock::new(Catalog::from_config(config)),
            adapter,
            grammar: Grammar::new(config.database.provider),
            log_queries: config.debug.log_queries,
        }
    }

    /// Override the grammar.
    pub fn with_grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// The grammar statements are rendered with.
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// The adapter statements are executed by.
    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    /// Read access to the catalog.
    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read()
    }

    /// Declare models and relations.
    pub fn declare<T>(&self, f: impl FnOnce(&mut Catalog) -> SchemaResult<T>) -> QueryResult<T> {
        let mut catalog = self.catalog.write();
        Ok(f(&mut catalog)?)
    }

    /// Resolve every relation now instead of on first use.
    pub fn configure(&self) -> QueryResult<()> {
        self.declare(Catalog::configure_all)
    }

    /// Run synchronous resolution against the catalog.
    pub(crate) fn plan<T>(&self, f: impl FnOnce(&mut Catalog) -> QueryResult<T>) -> QueryResult<T> {
        let mut catalog = self.catalog.write();
        f(&mut catalog)
    }

    /// Start a query on a model.
    pub fn query(&self, model: &str) -> QueryResult<ModelQuery<'_>> {
        ModelQuery::new(self, model)
    }

    /// Execute a statement.
    pub async fn execute(&self, statement: &Statement) -> QueryResult<ExecuteResult> {
        if self.log_queries {
            info!(sql = %statement.sql, args = ?statement.args, "Executing statement");
        } else {
            debug!(sql = %statement.sql, args = ?statement.args, "Executing statement");
        }
        self.adapter
            .execute(&statement.sql, &statement.args)
            .await
            .map_err(|err| match err.context.sql {
                Some(_) => err,
                None => err.with_sql(&statement.sql),
            })
    }

    /// Access a relation of a record.
    pub fn relation<'a>(&'a self, record: &'a Record, name: &str) -> QueryResult<RelationHandle<'a>> {
        let r = RelationRef::new(record.model(), name);
        let (path, kind) = self.plan(|catalog| {
            let relation = catalog
                .get(record.model())?
                .relation(name)
                .ok_or_else(|| QueryError::unknown_relation(name, "relation", record.model()))?;
            let kind = relation.kind();
            Ok((JoinPath::resolve(catalog, &r)?, kind))
        })?;
        Ok(RelationHandle::new(self, record, path, kind))
    }

    /// Build an unsaved record from logical attribute values.
    pub fn build(&self, model: &str, attrs: &[(&str, FilterValue)]) -> QueryResult<Record> {
        let catalog = self.catalog.read();
        let schema = catalog.get(model)?;
        let mut record = Record::new(model);
        for (attr, value) in attrs {
            let column = schema
                .column_for(attr)
                .ok_or_else(|| QueryError::invalid_field(attr, model, &schema.class_name()))?;
            record.set(column, value.clone());
        }
        Ok(record)
    }

    /// Insert a new record or update the changed columns of a persisted one.
    pub async fn save(&self, record: &mut Record) -> QueryResult<()> {
        let (table, pk) = self.table_and_key(record.model())?;

        if record.is_persisted() {
            let changes = record.changes();
            if changes.is_empty() {
                return Ok(());
            }
            let key = primary_key_value(record, &pk, "save")?;
            let statement = self.grammar.update(&table, &changes, &Filter::equals(pk.as_str(), key));
            self.execute(&statement).await?;
        } else {
            let values: Vec<(SmolStr, FilterValue)> = record
                .attrs()
                .iter()
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect();
            let statement = self.grammar.insert(&table, &values);
            let result = self.execute(&statement).await?;
            let has_key = record.get(&pk).is_some_and(|v| !v.is_null());
            if let (false, Some(id)) = (has_key, result.inserted_id) {
                record.set(pk.clone(), id);
            }
        }

        record.mark_saved();
        Ok(())
    }

    /// Delete a persisted record.
    pub async fn delete(&self, record: &mut Record) -> QueryResult<()> {
        let (table, pk) = self.table_and_key(record.model())?;
        let key = primary_key_value(record, &pk, "delete")?;
        let statement = self.grammar.delete(&table, &Filter::equals(pk.as_str(), key));
        self.execute(&statement).await?;
        record.mark_deleted();
        Ok(())
    }

    /// Turn result rows into records of `model`.
    pub(crate) fn materialize(model: &str, rows: Vec<Row>) -> Vec<Record> {
        rows.into_iter().map(|row| Record::persisted(model, row)).collect()
    }

    fn table_and_key(&self, model: &str) -> QueryResult<(SmolStr, SmolStr)> {
        let catalog = self.catalog.read();
        let schema = catalog.get(model)?;
        Ok((SmolStr::new(schema.table()), SmolStr::new(schema.primary_key_column())))
    }
}

fn primary_key_value(record: &Record, column: &str, operation: &str) -> QueryResult<FilterValue> {
    record
        .get(column)
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| QueryError::missing_primary_key(operation, &pascal_case(record.model())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::row;
    use crate::testing::ScriptedAdapter;
    use pretty_assertions::assert_eq;
    use strata_schema::RelationOptions;

    fn database() -> (Arc<ScriptedAdapter>, Database) {
        let adapter = Arc::new(ScriptedAdapter::new());
        let db = Database::new(adapter.clone());
        db.declare(|catalog| {
            catalog.model("comment").field("body");
            catalog.model("blog").field("title");
            catalog
                .model("article")
                .field("title")
                .has_many("comments", RelationOptions::new())?;
            Ok(())
        })
        .unwrap();
        (adapter, db)
    }

    #[tokio::test]
    async fn test_save_updates_dirty_columns() {
        let (adapter, db) = database();
        let mut blog = Record::persisted("blog", row! { "id" => 12, "title" => "Azul.js Blog" });
        blog.set("title", "AzulJS Blog");
        db.save(&mut blog).await.unwrap();

        let executed = adapter.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].sql, r#"UPDATE "blogs" SET "title" = ? WHERE "id" = ?"#);
        assert_eq!(executed[0].args, vec![FilterValue::from("AzulJS Blog"), FilterValue::Int(12)]);
        assert!(!blog.is_dirty());

        // Nothing changed, nothing executed.
        db.save(&mut blog).await.unwrap();
        assert_eq!(adapter.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_captures_id() {
        let (adapter, db) = database();
        let mut comment = db.build("comment", &[("body", "Great".into())]).unwrap();
        db.save(&mut comment).await.unwrap();

        assert_eq!(adapter.executed_sql(), vec![r#"INSERT INTO "comments" ("body") VALUES (?)"#]);
        assert_eq!(comment.get("id"), Some(&FilterValue::Int(1)));
        assert!(comment.is_persisted());
    }

    #[tokio::test]
    async fn test_delete_requires_key() {
        let (adapter, db) = database();
        let mut comment = Record::new("comment");
        let err = db.delete(&mut comment).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingPrimaryKey);
        assert!(adapter.executed().is_empty());

        let mut comment = Record::persisted("comment", row! { "id" => 3 });
        db.delete(&mut comment).await.unwrap();
        assert_eq!(adapter.executed_sql(), vec![r#"DELETE FROM "comments" WHERE "id" = ?"#]);
        assert!(!comment.is_persisted());
    }

    #[test]
    fn test_build_rejects_unknown_attribute() {
        let (_, db) = database();
        let err = db.build("comment", &[("subject", "x".into())]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidField);
        assert!(err.to_string().contains("\"subject\" in comment query with Comment class"));
    }

    #[tokio::test]
    async fn test_adapter_error_carries_sql() {
        let (adapter, db) = database();
        adapter.fail("^DELETE", "disk I/O error");
        let mut comment = Record::persisted("comment", row! { "id" => 3 });
        let err = db.delete(&mut comment).await.unwrap_err();
        assert!(err.is_adapter());
        assert_eq!(err.context.sql.as_deref(), Some(r#"DELETE FROM "comments" WHERE "id" = ?"#));
        assert!(comment.is_persisted());
    }

    #[test]
    fn test_unknown_relation_on_record() {
        let (_, db) = database();
        let article = Record::persisted("article", row! { "id" => 9 });
        let err = db.relation(&article, "tags").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownRelation);
    }
}

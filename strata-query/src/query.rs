//! Queries bound to a model.

use indexmap::IndexSet;
use smol_str::SmolStr;
use strata_schema::{Catalog, RelationKind, RelationRef};

use crate::database::Database;
use crate::error::{QueryError, QueryResult};
use crate::filter::{ColumnRef, Filter, FilterValue};
use crate::record::Record;
use crate::relations::loader;
use crate::relations::{IncludeTree, JoinPath};
use crate::sql::{Join, Projection, Select, Statement};

/// A SELECT over one model's table.
///
/// Relation names are checked when they are added, so an unknown relation
/// fails at build time rather than at execution.
///
/// ```rust,ignore
/// let site = db
///     .query("site")?
///     .with("comments")?
///     .find(41)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ModelQuery<'a> {
    db: &'a Database,
    model: SmolStr,
    table: SmolStr,
    primary_key: SmolStr,
    joins: Vec<Join>,
    joined: IndexSet<String>,
    filter: Filter,
    limit: Option<usize>,
    includes: IncludeTree,
}

impl<'a> ModelQuery<'a> {
    pub(crate) fn new(db: &'a Database, model: &str) -> QueryResult<Self> {
        let (table, primary_key) = {
            let catalog = db.catalog();
            let schema = catalog.get(model)?;
            (SmolStr::new(schema.table()), SmolStr::new(schema.primary_key_column()))
        };
        Ok(Self {
            db,
            model: SmolStr::new(model),
            table,
            primary_key,
            joins: Vec::new(),
            joined: IndexSet::new(),
            filter: Filter::None,
            limit: None,
            includes: IncludeTree::new(),
        })
    }

    /// The model being queried.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Relations requested for eager loading.
    pub fn includes(&self) -> &IncludeTree {
        &self.includes
    }

    /// Eager load a relation path such as `"comments"` or `"posts.author"`.
    pub fn with(mut self, path: &str) -> QueryResult<Self> {
        let model = self.model.clone();
        self.db.plan(|catalog| walk(catalog, &model, path, "with").map(|_| ()))?;
        self.includes.add_path(path);
        Ok(self)
    }

    /// Join the tables of a relation path.
    pub fn join(mut self, path: &str) -> QueryResult<Self> {
        self.join_path(path, "join")?;
        Ok(self)
    }

    /// Filter on `field = value`.
    ///
    /// `field` is an attribute of the model, or a dotted path ending in an
    /// attribute of a related model (`"author.id"`), which joins the
    /// relation automatically.
    pub fn where_eq(mut self, field: &str, value: impl Into<FilterValue>) -> QueryResult<Self> {
        let column = self.column(field)?;
        self.filter = std::mem::take(&mut self.filter).and_then(Filter::Equals(column, value.into()));
        Ok(self)
    }

    /// Filter on `field IN (values)`.
    pub fn where_in<V: Into<FilterValue>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> QueryResult<Self> {
        let column = self.column(field)?;
        let values = values.into_iter().map(Into::into).collect();
        self.filter = std::mem::take(&mut self.filter).and_then(Filter::In(column, values));
        Ok(self)
    }

    /// AND a prebuilt filter. Columns are not checked.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter);
        self
    }

    /// Limit the number of rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The SELECT this query executes.
    pub fn statement(&self) -> Statement {
        let mut select = Select::from(self.table.clone());
        let mut filter = self.filter.clone();
        if !self.joins.is_empty() {
            select = select.project(Projection::Table(self.table.clone()));
            filter.qualify(&self.table);
            for join in &self.joins {
                select = select.join(join.clone());
            }
        }
        select = select.filter(filter);
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }
        self.db.grammar().select(&select)
    }

    /// Fetch every matching record with requested relations attached.
    pub async fn all(&self) -> QueryResult<Vec<Record>> {
        let result = self.db.execute(&self.statement()).await?;
        let mut records = Database::materialize(&self.model, result.rows);
        loader::load(self.db, &self.model, &mut records, &self.includes).await?;
        Ok(records)
    }

    /// Fetch the first matching record.
    pub async fn first(&self) -> QueryResult<Option<Record>> {
        Ok(self.clone().limit(1).all().await?.into_iter().next())
    }

    /// Fetch a record by primary key.
    pub async fn find(&self, key: impl Into<FilterValue>) -> QueryResult<Record> {
        let key = key.into();
        let column = ColumnRef::new(self.primary_key.clone());
        self.clone()
            .filter(Filter::Equals(column, key.clone()))
            .first()
            .await?
            .ok_or_else(|| QueryError::not_found(self.model.as_str(), &key))
    }

    /// Add joins for `path` unless already joined. Returns the model the
    /// path ends at.
    fn join_path(&mut self, path: &str, operation: &str) -> QueryResult<SmolStr> {
        let model = self.model.clone();
        let hops = self.db.plan(|catalog| walk(catalog, &model, path, operation))?;

        let mut prefix = String::new();
        let mut target = model;
        for (r, join_path) in hops {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(&r.name);
            if self.joined.insert(prefix.clone()) {
                self.joins.extend(join_path.forward_joins());
            }
            target = SmolStr::new(join_path.target_model().unwrap_or(r.model.as_str()));
        }
        Ok(target)
    }

    /// Resolve a (possibly dotted) field to a column.
    fn column(&mut self, field: &str) -> QueryResult<ColumnRef> {
        match field.rsplit_once('.') {
            Some((path, attr)) => {
                let target = self.join_path(path, "where")?;
                let table = SmolStr::new(self.db.catalog().get(&target)?.table());
                let column = self.db.plan(|catalog| column_for(catalog, &self.model, &target, attr))?;
                Ok(ColumnRef::qualified(table, column))
            }
            None => {
                let column = self.db.plan(|catalog| column_for(catalog, &self.model, &self.model, field))?;
                Ok(ColumnRef::new(column))
            }
        }
    }
}

/// Resolve each segment of a relation path starting at `model`.
fn walk(
    catalog: &mut Catalog,
    model: &str,
    path: &str,
    operation: &str,
) -> QueryResult<Vec<(RelationRef, JoinPath)>> {
    let mut current = SmolStr::new(model);
    let mut hops = Vec::new();
    for segment in path.split('.') {
        if !catalog.get(&current)?.has_relation(segment) {
            return Err(QueryError::unknown_relation(segment, operation, &current));
        }
        let r = RelationRef::new(current.clone(), segment);
        let join_path = JoinPath::resolve(catalog, &r)?;
        current = catalog.target_model(&r)?;
        hops.push((r, join_path));
    }
    Ok(hops)
}

/// Column of `attr` on `model`.
///
/// Falls back to the foreign key attributes of the model's belongs-to
/// relations, which need not be declared as attributes. Only relations that
/// can add a belongs-to to `model` are resolved first.
fn column_for(catalog: &mut Catalog, query_model: &str, model: &str, attr: &str) -> QueryResult<SmolStr> {
    if let Some(column) = catalog.get(model)?.column_for(attr) {
        return Ok(SmolStr::new(column));
    }

    let pointing_here: Vec<RelationRef> = catalog
        .models()
        .flat_map(|m| m.relations())
        .filter(|rel| !rel.is_through() && rel.kind() == RelationKind::HasMany && rel.related() == model)
        .map(|rel| rel.to_ref())
        .collect();
    for r in &pointing_here {
        catalog.inverse(r)?;
    }
    let belongs_to: Vec<RelationRef> = catalog
        .get(model)?
        .relations()
        .filter(|rel| rel.kind() == RelationKind::BelongsTo)
        .map(|rel| rel.to_ref())
        .collect();
    for r in belongs_to {
        if catalog.foreign_key(&r)?.as_deref() == Some(attr) {
            if let Some(column) = catalog.foreign_key_attr(&r)? {
                return Ok(column);
            }
        }
    }

    let class_name = catalog.get(model)?.class_name();
    Err(QueryError::invalid_field(attr, query_model, &class_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::ScriptedAdapter;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use strata_schema::RelationOptions;

    fn database() -> Database {
        let db = Database::new(Arc::new(ScriptedAdapter::new()));
        db.declare(|catalog| {
            catalog.model("user").field("username");
            catalog.model("author").field("name");
            catalog
                .model("article")
                .field("title")
                .belongs_to("author", RelationOptions::new())?;
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn test_plain_statement() {
        let db = database();
        let stmt = db.query("user").unwrap().where_eq("username", "wbyoung").unwrap().statement();
        assert_eq!(stmt.sql, r#"SELECT * FROM "users" WHERE "username" = ?"#);
        assert_eq!(stmt.args, vec![FilterValue::from("wbyoung")]);
    }

    #[test]
    fn test_invalid_field() {
        let db = database();
        let err = db.query("user").unwrap().where_eq("invalidAttr", "value").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidField);
        assert!(err.to_string().contains(r#"invalid field "invalidAttr" in user query with User class"#));
    }

    #[test]
    fn test_unknown_relation_in_with_and_join() {
        let db = database();
        let err = db.query("user").unwrap().with("streets").unwrap_err();
        assert!(err.to_string().contains(r#"no relation "streets" for `with` in user query"#));

        let err = db.query("user").unwrap().join("streets").unwrap_err();
        assert!(err.to_string().contains(r#"no relation "streets" for `join` in user query"#));
        assert!(err.is_usage());
    }

    #[test]
    fn test_where_auto_joins() {
        let db = database();
        let stmt = db
            .query("article")
            .unwrap()
            .where_eq("author.id", 7)
            .unwrap()
            .where_eq("title", "Hello")
            .unwrap()
            .statement();
        assert_eq!(
            stmt.sql,
            r#"SELECT "articles".* FROM "articles" INNER JOIN "authors" ON "articles"."author_id" = "authors"."id" WHERE "authors"."id" = ? AND "articles"."title" = ?"#
        );
        assert_eq!(stmt.args, vec![FilterValue::Int(7), FilterValue::from("Hello")]);
    }

    #[test]
    fn test_join_is_not_repeated() {
        let db = database();
        let stmt = db
            .query("article")
            .unwrap()
            .join("author")
            .unwrap()
            .where_eq("author.name", "Whitney")
            .unwrap()
            .statement();
        assert_eq!(stmt.sql.matches("INNER JOIN").count(), 1);
    }

    #[test]
    fn test_foreign_key_attribute() {
        let db = database();
        let stmt = db.query("article").unwrap().where_in("authorId", [1, 2]).unwrap().statement();
        assert_eq!(stmt.sql, r#"SELECT * FROM "articles" WHERE "author_id" IN (?, ?)"#);
    }

    #[test]
    fn test_invalid_field_ignores_unrelated_relations() {
        let db = database();
        db.declare(|catalog| {
            catalog.model("site").has_many("ghosts", RelationOptions::new())?;
            catalog.model("author").has_many("articles", RelationOptions::new())?;
            Ok(())
        })
        .unwrap();

        let err = db.query("user").unwrap().where_eq("invalidAttr", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidField);

        let stmt = db.query("article").unwrap().where_eq("authorId", 3).unwrap().statement();
        assert_eq!(stmt.sql, r#"SELECT * FROM "articles" WHERE "author_id" = ?"#);
    }

    #[tokio::test]
    async fn test_first_and_find_borrow_the_query() {
        let adapter = Arc::new(ScriptedAdapter::new());
        adapter.respond(r#"FROM "users""#, vec![crate::row! { "id" => 4, "username" => "wbyoung" }]);
        let db = Database::new(adapter.clone());
        db.declare(|catalog| {
            catalog.model("user").field("username");
            Ok(())
        })
        .unwrap();

        let query = db.query("user").unwrap();
        assert!(query.first().await.unwrap().is_some());
        query.find(4).await.unwrap();
        assert_eq!(
            adapter.executed_sql(),
            vec![
                r#"SELECT * FROM "users" LIMIT 1"#,
                r#"SELECT * FROM "users" WHERE "id" = ? LIMIT 1"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_find_not_found() {
        let db = database();
        let err = db.query("user").unwrap().find(99).await.unwrap_err();
        assert!(err.is_not_found());
    }
}

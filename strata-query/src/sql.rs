//! SQL generation.
//!
//! [`Grammar`] turns [`Select`] descriptions and write operations into
//! [`Statement`]s: SQL text plus positional arguments. Identifiers are always
//! double quoted.

use smol_str::SmolStr;
use strata_schema::DatabaseProvider;

use crate::filter::{ColumnRef, Filter, FilterValue};

/// Escape a string for use in SQL (for identifiers, not values).
pub fn escape_identifier(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Placeholder syntax for statement arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    /// `?` for every argument (SQLite, MySQL).
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
}

impl Placeholder {
    /// Placeholder for the argument at 1-based `index`.
    pub fn render(&self, index: usize) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::Numbered => format!("${}", index),
        }
    }
}

impl From<DatabaseProvider> for Placeholder {
    fn from(provider: DatabaseProvider) -> Self {
        match provider {
            DatabaseProvider::PostgreSql => Self::Numbered,
            DatabaseProvider::MySql | DatabaseProvider::Sqlite => Self::Question,
        }
    }
}

/// SQL text with its positional arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Arguments bound to the placeholders, in order.
    pub args: Vec<FilterValue>,
}

impl Statement {
    /// Create a statement.
    pub fn new(sql: impl Into<String>, args: Vec<FilterValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// Columns returned by a [`Select`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// `*`
    #[default]
    All,
    /// `"table".*`
    Table(SmolStr),
}

/// `INNER JOIN "table" ON left = right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Joined table.
    pub table: SmolStr,
    /// Left side of the join condition.
    pub left: ColumnRef,
    /// Right side of the join condition.
    pub right: ColumnRef,
}

impl Join {
    /// Create an inner join.
    pub fn inner(table: impl Into<SmolStr>, left: ColumnRef, right: ColumnRef) -> Self {
        Self {
            table: table.into(),
            left,
            right,
        }
    }
}

/// A SELECT statement before rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    /// Base table.
    pub table: SmolStr,
    /// Selected columns.
    pub projection: Projection,
    /// Inner joins, in order.
    pub joins: Vec<Join>,
    /// WHERE condition.
    pub filter: Filter,
    /// Row limit.
    pub limit: Option<usize>,
}

impl Select {
    /// `SELECT * FROM table`.
    pub fn from(table: impl Into<SmolStr>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Set the projection.
    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Append an inner join.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// AND a condition onto the WHERE clause.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter);
        self
    }

    /// Set the row limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Renders statements for one database dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grammar {
    placeholder: Placeholder,
}

impl Grammar {
    /// Grammar for a database provider.
    pub fn new(provider: DatabaseProvider) -> Self {
        Self {
            placeholder: provider.into(),
        }
    }

    /// Grammar with `?` placeholders.
    pub fn sqlite() -> Self {
        Self::new(DatabaseProvider::Sqlite)
    }

    /// Grammar with `$n` placeholders.
    pub fn postgres() -> Self {
        Self::new(DatabaseProvider::PostgreSql)
    }

    /// The placeholder style in use.
    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// Render a SELECT.
    pub fn select(&self, select: &Select) -> Statement {
        let mut builder = SqlBuilder::new(self.placeholder);
        builder.push("SELECT ");
        match &select.projection {
            Projection::All => builder.push("*"),
            Projection::Table(table) => builder.push_identifier(table).push(".*"),
        };
        builder.push(" FROM ").push_identifier(&select.table);
        for join in &select.joins {
            builder
                .push(" INNER JOIN ")
                .push_identifier(&join.table)
                .push(" ON ")
                .push_column(&join.left)
                .push(" = ")
                .push_column(&join.right);
        }
        builder.push_where(&select.filter);
        if let Some(limit) = select.limit {
            builder.push(format!(" LIMIT {}", limit));
        }
        builder.build()
    }

    /// Render `INSERT INTO "table" ("a", ...) VALUES (?, ...)`.
    pub fn insert(&self, table: &str, values: &[(SmolStr, FilterValue)]) -> Statement {
        let mut builder = SqlBuilder::new(self.placeholder);
        builder.push("INSERT INTO ").push_identifier(table);
        if values.is_empty() {
            builder.push(" DEFAULT VALUES");
            return builder.build();
        }
        builder.push(" (");
        for (i, (column, _)) in values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push_identifier(column);
        }
        builder.push(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push_param(value.clone());
        }
        builder.push(")");
        builder.build()
    }

    /// Render `UPDATE "table" SET "a" = ?, ... WHERE ...`.
    pub fn update(&self, table: &str, values: &[(SmolStr, FilterValue)], filter: &Filter) -> Statement {
        let mut builder = SqlBuilder::new(self.placeholder);
        builder.push("UPDATE ").push_identifier(table).push(" SET ");
        for (i, (column, value)) in values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push_identifier(column).push(" = ").push_param(value.clone());
        }
        builder.push_where(filter);
        builder.build()
    }

    /// Render `DELETE FROM "table" WHERE ...`.
    pub fn delete(&self, table: &str, filter: &Filter) -> Statement {
        let mut builder = SqlBuilder::new(self.placeholder);
        builder.push("DELETE FROM ").push_identifier(table);
        builder.push_where(filter);
        builder.build()
    }
}

/// Accumulates SQL text and arguments.
#[derive(Debug, Clone)]
struct SqlBuilder {
    placeholder: Placeholder,
    sql: String,
    params: Vec<FilterValue>,
}

impl SqlBuilder {
    fn new(placeholder: Placeholder) -> Self {
        Self {
            placeholder,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, sql: impl AsRef<str>) -> &mut Self {
        self.sql.push_str(sql.as_ref());
        self
    }

    fn push_param(&mut self, value: FilterValue) -> &mut Self {
        let index = self.params.len() + 1;
        self.sql.push_str(&self.placeholder.render(index));
        self.params.push(value);
        self
    }

    fn push_identifier(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&escape_identifier(name));
        self
    }

    fn push_column(&mut self, column: &ColumnRef) -> &mut Self {
        if let Some(table) = &column.table {
            self.push_identifier(table).push(".");
        }
        self.push_identifier(&column.column)
    }

    fn push_where(&mut self, filter: &Filter) -> &mut Self {
        if !filter.is_none() {
            self.push(" WHERE ");
            self.push_filter(filter, false);
        }
        self
    }

    fn push_list(&mut self, values: &[FilterValue]) -> &mut Self {
        self.push("(");
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_param(value.clone());
        }
        self.push(")")
    }

    fn push_compare(&mut self, column: &ColumnRef, op: &str, value: &FilterValue) -> &mut Self {
        self.push_column(column).push(op).push_param(value.clone())
    }

    /// Nested AND/OR groups are parenthesized; the top level is not.
    fn push_filter(&mut self, filter: &Filter, nested: bool) {
        match filter {
            Filter::None => {
                self.push("1 = 1");
            }
            Filter::Equals(c, FilterValue::Null) | Filter::IsNull(c) => {
                self.push_column(c).push(" IS NULL");
            }
            Filter::NotEquals(c, FilterValue::Null) | Filter::IsNotNull(c) => {
                self.push_column(c).push(" IS NOT NULL");
            }
            Filter::Equals(c, v) => {
                self.push_compare(c, " = ", v);
            }
            Filter::NotEquals(c, v) => {
                self.push_compare(c, " <> ", v);
            }
            Filter::Lt(c, v) => {
                self.push_compare(c, " < ", v);
            }
            Filter::Lte(c, v) => {
                self.push_compare(c, " <= ", v);
            }
            Filter::Gt(c, v) => {
                self.push_compare(c, " > ", v);
            }
            Filter::Gte(c, v) => {
                self.push_compare(c, " >= ", v);
            }
            Filter::In(_, values) if values.is_empty() => {
                self.push("1 = 0");
            }
            Filter::NotIn(_, values) if values.is_empty() => {
                self.push("1 = 1");
            }
            Filter::In(c, values) => {
                self.push_column(c).push(" IN ").push_list(values);
            }
            Filter::NotIn(c, values) => {
                self.push_column(c).push(" NOT IN ").push_list(values);
            }
            Filter::And(filters) => self.push_group(filters, " AND ", nested),
            Filter::Or(filters) => self.push_group(filters, " OR ", nested),
            Filter::Not(inner) => {
                self.push("NOT (");
                self.push_filter(inner, false);
                self.push(")");
            }
        }
    }

    fn push_group(&mut self, filters: &[Filter], sep: &str, nested: bool) {
        if filters.len() == 1 {
            self.push_filter(&filters[0], nested);
            return;
        }
        if nested {
            self.push("(");
        }
        for (i, f) in filters.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            self.push_filter(f, true);
        }
        if nested {
            self.push(")");
        }
    }

    fn build(self) -> Statement {
        Statement::new(self.sql, self.params)
    }
}

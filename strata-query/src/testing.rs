//! A scripted adapter for tests.
//!
//! [`ScriptedAdapter`] answers statements from canned responders matched by
//! regular expression and records everything it executes.
//!
//! ```rust
//! use strata_query::testing::ScriptedAdapter;
//! use strata_query::row;
//!
//! let adapter = ScriptedAdapter::new();
//! adapter.respond(r#"^SELECT.*FROM "sites""#, vec![row! { "id" => 41, "name" => "Azul.js" }]);
//! ```

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use regex_lite::Regex;
use smol_str::SmolStr;
use strata_schema::DatabaseProvider;

use crate::adapter::{Adapter, ExecuteResult, Row};
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::sql::Statement;

#[derive(Debug, Clone)]
enum Reply {
    Result(ExecuteResult),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Responder {
    pattern: SmolStr,
    reply: Reply,
}

/// Error raised by [`ScriptedAdapter::fail`] responders.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ScriptedFailure(pub String);

/// An [`Adapter`] returning canned results.
///
/// The first responder whose pattern matches the SQL wins. Statements with
/// no responder return no rows; an INSERT without a responder gets the next
/// id from a counter starting at 1.
#[derive(Debug)]
pub struct ScriptedAdapter {
    provider: DatabaseProvider,
    responders: Mutex<Vec<Responder>>,
    executed: Mutex<Vec<Statement>>,
    next_id: AtomicI64,
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAdapter {
    /// Create an adapter with no responders.
    pub fn new() -> Self {
        Self::with_provider(DatabaseProvider::Sqlite)
    }

    /// Create an adapter reporting the given dialect.
    pub fn with_provider(provider: DatabaseProvider) -> Self {
        Self {
            provider,
            responders: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Answer statements matching `pattern` with `rows`.
    pub fn respond(&self, pattern: &str, rows: Vec<Row>) -> &Self {
        self.respond_with(pattern, ExecuteResult::from_rows(rows))
    }

    /// Answer statements matching `pattern` with a full result.
    pub fn respond_with(&self, pattern: &str, result: ExecuteResult) -> &Self {
        self.push(pattern, Reply::Result(result))
    }

    /// Fail statements matching `pattern` with an adapter error.
    pub fn fail(&self, pattern: &str, message: impl Into<String>) -> &Self {
        self.push(pattern, Reply::Fail(message.into()))
    }

    fn push(&self, pattern: &str, reply: Reply) -> &Self {
        self.responders.lock().push(Responder {
            pattern: SmolStr::new(pattern),
            reply,
        });
        self
    }

    /// Every statement executed so far.
    pub fn executed(&self) -> Vec<Statement> {
        self.executed.lock().clone()
    }

    /// SQL of every statement executed so far.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().iter().map(|s| s.sql.clone()).collect()
    }

    /// Forget executed statements.
    pub fn clear(&self) {
        self.executed.lock().clear();
    }

    fn reply_for(&self, sql: &str) -> QueryResult<Option<Reply>> {
        let responders = self.responders.lock();
        for responder in responders.iter() {
            let regex = Regex::new(&responder.pattern).map_err(|e| {
                QueryError::internal(format!("invalid responder pattern {:?}: {}", responder.pattern, e))
            })?;
            if regex.is_match(sql) {
                return Ok(Some(responder.reply.clone()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    async fn execute(&self, sql: &str, args: &[FilterValue]) -> QueryResult<ExecuteResult> {
        self.executed.lock().push(Statement::new(sql, args.to_vec()));

        match self.reply_for(sql)? {
            Some(Reply::Result(result)) => Ok(result),
            Some(Reply::Fail(message)) => Err(QueryError::adapter(ScriptedFailure(message))),
            None if sql.starts_with("INSERT") => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                Ok(ExecuteResult::default().with_inserted_id(id))
            }
            None => Ok(ExecuteResult::default()),
        }
    }

    fn provider(&self) -> DatabaseProvider {
        self.provider
    }
}

/// Build a [`Row`] from `column => value` pairs.
///
/// ```rust
/// use strata_query::{FilterValue, row};
///
/// let r = row! { "id" => 12, "title" => "Azul.js Blog" };
/// assert_eq!(r.get("id"), Some(&FilterValue::Int(12)));
/// ```
#[macro_export]
macro_rules! row {
    ($($column:expr => $value:expr),* $(,)?) => {{
        let mut row = $crate::adapter::Row::new();
        $(
            row.insert(::std::convert::Into::into($column), $crate::filter::FilterValue::from($value));
        )*
        row
    }};
}

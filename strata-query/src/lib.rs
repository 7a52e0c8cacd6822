//! # strata-query
//!
//! Queries, relation access and eager loading for the Strata ORM.
//!
//! This crate provides:
//! - Values and filters for WHERE clauses
//! - SQL generation through a dialect [`Grammar`]
//! - The [`Adapter`] seam to a database driver, and a scripted adapter for tests
//! - [`Database`], [`ModelQuery`] and materialized [`Record`]s
//! - Join paths for through relations and batched eager loading (`with`)
//! - Relation accessors with create/add/remove/clear
//!
//! ## Queries
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_query::{Database, testing::ScriptedAdapter};
//! use strata_schema::RelationOptions;
//!
//! let db = Database::new(Arc::new(ScriptedAdapter::new()));
//! db.declare(|catalog| {
//!     catalog.model("comment").field("body");
//!     catalog
//!         .model("blog")
//!         .has_many("articles", RelationOptions::new())?
//!         .has_many("comments", RelationOptions::new().through("articles"))?;
//!     catalog.model("article").has_many("comments", RelationOptions::new())?;
//!     Ok(())
//! })?;
//!
//! // Unknown relations fail when the query is built.
//! assert!(db.query("blog")?.with("tags").is_err());
//! let query = db.query("blog")?.with("comments")?;
//! assert_eq!(query.includes().paths(), vec!["comments"]);
//! # Ok::<(), strata_query::QueryError>(())
//! ```
//!
//! ## Filter Values
//!
//! ```rust
//! use strata_query::FilterValue;
//!
//! let val: FilterValue = 42.into();
//! assert!(matches!(val, FilterValue::Int(42)));
//!
//! let val: FilterValue = "hello".into();
//! assert!(matches!(val, FilterValue::String(_)));
//!
//! let val: FilterValue = None::<i64>.into();
//! assert!(val.is_null());
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use strata_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_loaded("users", "Site");
//! assert_eq!(err.code, ErrorCode::RelationNotLoaded);
//! assert!(err.is_usage());
//! ```

pub mod adapter;
pub mod database;
pub mod error;
pub mod filter;
pub mod logging;
pub mod query;
pub mod record;
pub mod relations;
pub mod sql;
pub mod testing;

pub use adapter::{Adapter, ExecuteResult, Row};
pub use database::Database;
pub use error::{ErrorCode, ErrorContext, ErrorKind, QueryError, QueryResult};
pub use filter::{ColumnRef, Filter, FilterValue, ValueKey};
pub use query::ModelQuery;
pub use record::{Loaded, Record};
pub use relations::{IncludeTree, JoinPath, RelationHandle, RelationOp};
pub use sql::{Grammar, Join, Placeholder, Projection, Select, Statement};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, init_from_config, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adapter::{Adapter, ExecuteResult};
    pub use crate::database::Database;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::query::ModelQuery;
    pub use crate::record::Record;
    pub use crate::relations::RelationHandle;
    pub use crate::row;
}

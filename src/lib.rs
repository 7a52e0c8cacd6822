//! # Strata
//!
//! A relation-aware async ORM.
//!
//! Strata provides:
//! - A catalog of models declared with `belongs_to` and `has_many` relations
//! - Lazily resolved relation keys and inverses, checked for consistency
//! - `through` relations expanded into multi-hop joins
//! - Batched eager loading with one query per hop
//! - A pluggable adapter, with SQLite support behind the `sqlite` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use strata::prelude::*;
//! use strata::query::testing::ScriptedAdapter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), strata::query::QueryError> {
//! let adapter = Arc::new(ScriptedAdapter::new());
//! let db = Database::new(adapter.clone());
//! db.declare(|catalog| {
//!     catalog
//!         .model("blog")
//!         .has_many("articles", RelationOptions::new())?
//!         .has_many("comments", RelationOptions::new().through("articles"))?;
//!     catalog.model("article").has_many("comments", RelationOptions::new())?;
//!     catalog.model("comment").field("body");
//!     Ok(())
//! })?;
//!
//! let blog = Record::persisted("blog", row! { "id" => 12 });
//! db.relation(&blog, "comments")?.fetch().await?;
//!
//! assert_eq!(
//!     adapter.executed_sql(),
//!     vec![r#"SELECT "comments".* FROM "comments" INNER JOIN "articles" ON "comments"."article_id" = "articles"."id" WHERE "articles"."blog_id" = ?"#]
//! );
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Model catalog and relation resolution.
pub mod schema {
    pub use strata_schema::*;
}

/// Queries, eager loading and relation accessors.
pub mod query {
    pub use strata_query::*;
}

/// The SQLite adapter.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use strata_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::query::prelude::*;
    pub use crate::schema::{Catalog, RelationKind, RelationOptions, RelationRef, StrataConfig};
    #[cfg(feature = "sqlite")]
    pub use crate::sqlite::{SqliteAdapter, SqliteConfig};
}

// Re-export key types at the crate root
pub use query::{Database, QueryError, QueryResult, Record};
pub use schema::{Catalog, SchemaError, StrataConfig};

//! # strata-schema
//!
//! Model catalog and relation resolution for the Strata ORM.
//!
//! This crate provides:
//! - Identifier inflection used to derive table, key and relation names
//! - [`Catalog`], the registry of [`Model`]s and their [`Relation`]s
//! - Lazy, memoized relation configuration (keys, columns, inverses)
//! - Through-relation expansion into chains of direct relations
//! - Configuration parser for `strata.toml` files
//!
//! ## Example
//!
//! ```rust
//! use strata_schema::{Catalog, RelationOptions, RelationRef};
//!
//! let mut catalog = Catalog::new();
//! catalog.model("article");
//! catalog.model("comment");
//! catalog
//!     .model("blog")
//!     .has_many("articles", RelationOptions::new())?
//!     .has_many("comments", RelationOptions::new().through("articles"))?;
//! catalog
//!     .model("article")
//!     .has_many("comments", RelationOptions::new())?;
//!
//! let chain = catalog.through_chain(&RelationRef::new("blog", "comments"))?;
//! assert_eq!(chain.len(), 2);
//! # Ok::<(), strata_schema::SchemaError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod inflection;
pub mod model;
pub mod relation;
pub mod resolve;

pub use catalog::{Catalog, ModelBuilder};
pub use config::{DatabaseProvider, NamingConfig, StrataConfig};
pub use error::{SchemaError, SchemaResult};
pub use model::Model;
pub use relation::{Relation, RelationKind, RelationOptions, RelationRef, ResolvedConfig};
pub use resolve::JoinEdge;

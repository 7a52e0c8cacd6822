//! SQLite adapter for the Strata ORM.
//!
//! [`SqliteAdapter`] implements [`strata_query::Adapter`] over a single
//! `tokio-rusqlite` connection, converting bound arguments and result
//! columns to [`strata_query::FilterValue`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_query::Database;
//! use strata_sqlite::{SqliteAdapter, SqliteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = SqliteAdapter::open(SqliteConfig::from_url("sqlite://./blog.db")?).await?;
//!     let db = Database::new(Arc::new(adapter));
//!     // Declare models and query...
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod types;

pub use adapter::SqliteAdapter;
pub use config::{DatabasePath, JournalMode, SqliteConfig};
pub use error::{SqliteError, SqliteResult};

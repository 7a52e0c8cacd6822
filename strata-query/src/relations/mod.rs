//! Relation access and eager loading.
//!
//! - [`JoinPath`] turns a relation's through chain into joins and key
//!   columns
//! - [`IncludeTree`] collects the dotted paths requested with `with(...)`
//! - the loader fetches requested relations for a result set, one query per
//!   hop
//! - [`RelationHandle`] fetches and mutates one record's relation
//!
//! ## Example
//!
//! ```rust,ignore
//! // Eager load every comment of a site, four hops away
//! let site = db.query("site")?.with("comments")?.find(41).await?;
//! let comments = site.related("comments")?;
//!
//! // Fetch through a single record
//! let comments = db.relation(&blog, "comments")?.fetch().await?;
//! ```

mod accessor;
mod include;
mod join;
pub(crate) mod loader;

pub use accessor::{RelationHandle, RelationOp};
pub use include::IncludeTree;
pub use join::JoinPath;

//! Integration tests for relation configuration and through resolution.
//!
//! These tests exercise the catalog through the `strata` facade, and check
//! that configuration errors surface unchanged through a `Database`.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use strata::prelude::*;
use strata::query::ErrorKind;
use strata::query::testing::ScriptedAdapter;
use strata::schema::JoinEdge;
use strata::SchemaError;

fn blog_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.model("user").field("username");
    catalog
        .model("user")
        .has_many("blogs", RelationOptions::new().inverse("owner"))
        .unwrap()
        .has_many("articles", RelationOptions::new().through("blogs"))
        .unwrap()
        .has_many("comments", RelationOptions::new().through("articles"))
        .unwrap();
    catalog
        .model("blog")
        .has_many("articles", RelationOptions::new())
        .unwrap();
    catalog
        .model("article")
        .has_many("comments", RelationOptions::new())
        .unwrap();
    catalog.model("comment").field("body");
    catalog
}

/// Test that keys are identical whatever order they are first read in
#[test]
fn test_access_order_independence() {
    let blogs = RelationRef::new("user", "blogs");

    let mut forward = blog_catalog();
    let fk_first = forward.foreign_key(&blogs).unwrap();
    let inverse_second = forward.inverse(&blogs).unwrap();

    let mut backward = blog_catalog();
    let inverse_first = backward.inverse(&blogs).unwrap();
    let fk_second = backward.foreign_key(&blogs).unwrap();

    assert_eq!(fk_first, fk_second);
    assert_eq!(inverse_first, inverse_second);
    assert_eq!(fk_first.as_deref(), Some("ownerId"));
    assert_eq!(inverse_first.as_deref(), Some("owner"));
}

/// Test that a synthesized inverse is visible on the related model
#[test]
fn test_inverse_is_synthesized() {
    let mut catalog = blog_catalog();
    catalog.configure_all().unwrap();

    let blog = catalog.get("blog").unwrap();
    let owner = blog.relation("owner").unwrap();
    assert!(owner.is_implicit());
    assert_eq!(owner.kind(), RelationKind::BelongsTo);
    assert_eq!(owner.related(), "user");
    assert_eq!(
        catalog.foreign_key_attr(&RelationRef::new("blog", "owner")).unwrap().as_deref(),
        Some("owner_id")
    );
}

/// Test that disagreeing foreign keys are rejected from either side
#[test]
fn test_foreign_key_mismatch() {
    let build = || {
        let mut catalog = Catalog::new();
        catalog
            .model("user")
            .has_many("blogs", RelationOptions::new().inverse("owner").foreign_key("writerId"))
            .unwrap();
        catalog
            .model("blog")
            .belongs_to("owner", RelationOptions::new().model("user").foreign_key("ownerKey"))
            .unwrap();
        catalog
    };

    for r in [RelationRef::new("user", "blogs"), RelationRef::new("blog", "owner")] {
        let err = build().foreign_key(&r).unwrap_err();
        assert!(matches!(err, SchemaError::ForeignKeyMismatch { .. }), "{err}");
        let message = err.to_string();
        assert!(message.contains("must equal"));
        assert!(message.contains("\"writerId\"") && message.contains("\"ownerKey\""));
        assert!(message.contains("User.blogs") && message.contains("Blog.owner"), "{message}");
    }
}

/// Test the join path of a two-hop through relation
#[test]
fn test_through_join_path() {
    let mut catalog = blog_catalog();
    let path = catalog.join_path(&RelationRef::new("user", "comments")).unwrap();

    let tables: Vec<(&str, &str)> = path
        .iter()
        .map(|edge: &JoinEdge| (edge.child_table.as_str(), edge.child_column.as_str()))
        .collect();
    assert_eq!(
        tables,
        vec![("blogs", "owner_id"), ("articles", "blog_id"), ("comments", "article_id")]
    );
    assert_eq!(catalog.target_model(&RelationRef::new("user", "comments")).unwrap(), "comment");
    assert_eq!(catalog.inverse(&RelationRef::new("user", "comments")).unwrap(), None);
}

/// Test that an ambiguous terminal relation needs an explicit source
#[test]
fn test_ambiguous_source() {
    let mut catalog = Catalog::new();
    catalog.model("review");
    catalog
        .model("site")
        .has_many("notes", RelationOptions::new().model("review").through("authors"))
        .unwrap();
    catalog
        .model("author")
        .has_many("drafts", RelationOptions::new().model("review"))
        .unwrap()
        .has_many("published", RelationOptions::new().model("review"))
        .unwrap();

    let err = catalog.through_chain(&RelationRef::new("site", "notes")).unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousSource { .. }));
    assert!(err.to_string().contains("drafts, published"));

    catalog
        .model("site")
        .has_many("drafts", RelationOptions::new().model("review").through("authors").source("drafts"))
        .unwrap();
    let chain = catalog.through_chain(&RelationRef::new("site", "drafts")).unwrap();
    assert_eq!(chain.last(), Some(&RelationRef::new("author", "drafts")));
}

/// Test that configuration errors reach query callers as configuration errors
#[tokio::test]
async fn test_configuration_error_through_database() {
    let adapter = Arc::new(ScriptedAdapter::new());
    let db = Database::new(adapter.clone());
    db.declare(|catalog| {
        catalog
            .model("site")
            .has_many("loops", RelationOptions::new().through("rings"))?
            .has_many("rings", RelationOptions::new().through("loops"))?;
        Ok(())
    })
    .unwrap();

    let site = Record::persisted("site", row! { "id" => 1 });
    let err = db.relation(&site, "loops").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(err.schema_error(), Some(SchemaError::CyclicThrough { .. })));

    let err = db.query("site").unwrap().with("loops").unwrap_err();
    assert!(err.is_configuration());
    assert!(adapter.executed().is_empty());
}

//! Relations against a real SQLite database.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use strata_query::{Database, FilterValue, Record};
use strata_schema::RelationOptions;
use strata_sqlite::{SqliteAdapter, SqliteConfig};

const SCHEMA: &str = r#"
    CREATE TABLE sites (id INTEGER PRIMARY KEY, name TEXT);
    CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT, site_id INTEGER REFERENCES sites (id));
    CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT, author_id INTEGER REFERENCES authors (id));
    CREATE TABLE commenters (id INTEGER PRIMARY KEY, name TEXT);
    CREATE TABLE comments (
        id INTEGER PRIMARY KEY,
        body TEXT,
        post_id INTEGER REFERENCES posts (id),
        commenter_id INTEGER REFERENCES commenters (id)
    );

    INSERT INTO sites (id, name) VALUES (37, 'azuljs.com'), (38, 'empty.com');
    INSERT INTO authors (id, name, site_id) VALUES (93, 'Tom', 37), (10, 'Jessie', 37);
    INSERT INTO posts (id, title, author_id) VALUES
        (14, 'First Post', 93), (94, 'Second Post', 10), (52, 'First Post', 10),
        (18, 'Second Post', 93), (10, 'Third Post', 10);
    INSERT INTO commenters (id, name) VALUES (1, 'John'), (2, 'Katy'), (3, 'Phil');
    INSERT INTO comments (id, body, post_id, commenter_id) VALUES
        (11, 'Comment #1 on first post by Tom', 14, 1),
        (83, 'Comment #2 on first post by Tom', 14, 2),
        (64, 'Comment #1 on first post by Jessie', 52, 2),
        (98, 'Comment #1 on 3rd post by Jessie', 10, 3);
"#;

async fn database(config: SqliteConfig) -> Database {
    let adapter = SqliteAdapter::open(config).await.unwrap();
    adapter.execute_batch(SCHEMA).await.unwrap();
    let db = Database::new(Arc::new(adapter));
    db.declare(|catalog| {
        catalog
            .model("site")
            .field("name")
            .has_many("authors", RelationOptions::new())?
            .has_many("commenters", RelationOptions::new().through("authors"))?;
        catalog
            .model("author")
            .field("name")
            .belongs_to("site", RelationOptions::new())?
            .has_many("posts", RelationOptions::new())?
            .has_many("commenters", RelationOptions::new().through("posts"))?;
        catalog
            .model("post")
            .field("title")
            .belongs_to("author", RelationOptions::new())?
            .has_many("comments", RelationOptions::new())?
            .has_many("commenters", RelationOptions::new().through("comments"))?;
        catalog
            .model("comment")
            .field("body")
            .belongs_to("post", RelationOptions::new())?
            .belongs_to("commenter", RelationOptions::new())?;
        catalog
            .model("commenter")
            .field("name")
            .has_many("comments", RelationOptions::new())?;
        Ok(())
    })
    .unwrap();
    db
}

fn names(records: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .filter_map(|record| record.get("name").and_then(FilterValue::as_str))
        .map(str::to_string)
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_fetch_through_three_hops() {
    let db = database(SqliteConfig::memory()).await;
    let site = db.query("site").unwrap().find(37).await.unwrap();

    let commenters = db.relation(&site, "commenters").unwrap().fetch().await.unwrap();

    // The join yields one row per comment.
    assert_eq!(commenters.len(), 4);
    let mut unique = names(&commenters);
    unique.dedup();
    assert_eq!(unique, vec!["John", "Katy", "Phil"]);
}

#[tokio::test]
async fn test_eager_load_through_relation() {
    let db = database(SqliteConfig::memory()).await;

    let sites = db.query("site").unwrap().with("commenters").unwrap().all().await.unwrap();

    assert_eq!(sites.len(), 2);
    assert_eq!(names(sites[0].related("commenters").unwrap()), vec!["John", "Katy", "Phil"]);
    assert!(sites[1].related("commenters").unwrap().is_empty());
    assert!(sites[0].related("authors").is_err());
}

#[tokio::test]
async fn test_nested_eager_load() {
    let db = database(SqliteConfig::memory()).await;

    let authors = db
        .query("author")
        .unwrap()
        .with("posts.comments")
        .unwrap()
        .with("site")
        .unwrap()
        .where_eq("name", "Tom")
        .unwrap()
        .all()
        .await
        .unwrap();

    assert_eq!(authors.len(), 1);
    let tom = &authors[0];
    let site = tom.related_one("site").unwrap().unwrap();
    assert_eq!(site.get("name"), Some(&FilterValue::from("azuljs.com")));

    let posts = tom.related("posts").unwrap();
    assert_eq!(posts.len(), 2);
    let comment_counts: Vec<usize> = posts
        .iter()
        .map(|post| post.related("comments").unwrap().len())
        .collect();
    assert_eq!(comment_counts, vec![2, 0]);
}

#[tokio::test]
async fn test_where_through_join() {
    let db = database(SqliteConfig::memory()).await;

    let posts = db
        .query("post")
        .unwrap()
        .where_eq("author.name", "Jessie")
        .unwrap()
        .all()
        .await
        .unwrap();

    let mut ids: Vec<i64> = posts.iter().filter_map(|p| p.get("id").and_then(FilterValue::as_i64)).collect();
    ids.sort();
    assert_eq!(ids, vec![10, 52, 94]);
}

#[tokio::test]
async fn test_direct_relation_mutations() {
    let db = database(SqliteConfig::memory()).await;
    let post = db.query("post").unwrap().find(18).await.unwrap();
    let comments = db.relation(&post, "comments").unwrap();

    let created = comments.create(&[("body", "Nice".into())]).await.unwrap();
    assert_eq!(created.get("id"), Some(&FilterValue::Int(99)));
    assert_eq!(comments.fetch().await.unwrap().len(), 1);

    let mut moved = vec![db.query("comment").unwrap().find(11).await.unwrap()];
    comments.add(&mut moved).await.unwrap();
    assert_eq!(comments.fetch().await.unwrap().len(), 2);

    comments.remove(&mut moved).await.unwrap();
    let orphan = db.query("comment").unwrap().find(11).await.unwrap();
    assert_eq!(orphan.get("post_id"), Some(&FilterValue::Null));

    comments.clear().await.unwrap();
    assert!(comments.fetch().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_belongs_to_fetch_one() {
    let db = database(SqliteConfig::memory()).await;
    let comment = db.query("comment").unwrap().find(64).await.unwrap();

    let commenter = db.relation(&comment, "commenter").unwrap().fetch_one().await.unwrap();

    assert_eq!(commenter.unwrap().get("name"), Some(&FilterValue::from("Katy")));
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blog.db");

    {
        let db = database(SqliteConfig::file(&path)).await;
        let mut site = db.build("site", &[("name", "new.com".into())]).unwrap();
        db.save(&mut site).await.unwrap();
        assert_eq!(site.get("id"), Some(&FilterValue::Int(39)));
    }

    let adapter = SqliteAdapter::connect(&format!("sqlite://{}", path.display())).await.unwrap();
    let db = Database::new(Arc::new(adapter));
    db.declare(|catalog| {
        catalog.model("site").field("name");
        Ok(())
    })
    .unwrap();
    let site = db.query("site").unwrap().find(39).await.unwrap();
    assert_eq!(site.get("name"), Some(&FilterValue::from("new.com")));
}

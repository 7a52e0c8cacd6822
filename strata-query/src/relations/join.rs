//! Join path assembly.
//!
//! Each hop of a relation's through chain becomes one [`JoinEdge`]. Joins
//! always compare the child's foreign key column with the parent's primary
//! key column, whichever direction the path is walked in.

use smol_str::SmolStr;
use strata_schema::{Catalog, JoinEdge, RelationKind, RelationRef, SchemaResult};

use crate::filter::{ColumnRef, Filter, FilterValue};
use crate::sql::{Join, Projection, Select};

/// The resolved tables and key columns connecting a relation's owner to its
/// records.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPath {
    relation: RelationRef,
    edges: Vec<JoinEdge>,
    /// Related model of every hop.
    models: Vec<SmolStr>,
}

impl JoinPath {
    /// Configure `r` and resolve its join path.
    pub fn resolve(catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Self> {
        catalog.configure(r)?;
        let edges = catalog.join_path(r)?;
        let models = edges
            .iter()
            .map(|edge| Ok(SmolStr::new(catalog.relation(&edge.relation)?.related())))
            .collect::<SchemaResult<Vec<_>>>()?;
        Ok(Self {
            relation: r.clone(),
            edges,
            models,
        })
    }

    /// The relation this path was resolved for.
    pub fn relation(&self) -> &RelationRef {
        &self.relation
    }

    /// One edge per direct hop, starting at the owner.
    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }

    /// Related model of the hop at `index`.
    pub fn model_at(&self, index: usize) -> Option<&str> {
        self.models.get(index).map(SmolStr::as_str)
    }

    /// The model whose records the relation yields.
    pub fn target_model(&self) -> Option<&str> {
        self.models.last().map(SmolStr::as_str)
    }

    /// Whether the path spans more than one hop.
    pub fn is_through(&self) -> bool {
        self.edges.len() > 1
    }

    /// Whether the relation yields at most one record.
    pub fn is_to_one(&self) -> bool {
        matches!(self.edges.as_slice(), [edge] if edge.kind == RelationKind::BelongsTo)
    }

    /// Column on the owner's table whose value keys the first hop.
    pub fn root_column(&self) -> Option<&str> {
        self.edges.first().map(JoinEdge::owner_column)
    }

    /// SELECT fetching the relation's records for one owner key value.
    ///
    /// A direct relation filters the related table on its key column. A
    /// through relation selects the last table, joins back hop by hop and
    /// filters the first hop's table.
    pub fn fetch_select(&self, key: FilterValue) -> Select {
        let (Some(first), Some(last)) = (self.edges.first(), self.edges.last()) else {
            return Select::default();
        };

        if !self.is_through() {
            return Select::from(first.related_table()).filter(Filter::equals(first.related_column(), key));
        }

        let mut select =
            Select::from(last.related_table()).project(Projection::Table(SmolStr::new(last.related_table())));
        for edge in self.edges[1..].iter().rev() {
            select = select.join(Join::inner(
                edge.owner_table(),
                ColumnRef::qualified(edge.child_table.clone(), edge.child_column.clone()),
                ColumnRef::qualified(edge.parent_table.clone(), edge.parent_column.clone()),
            ));
        }
        select.filter(Filter::Equals(
            ColumnRef::qualified(first.related_table(), first.related_column()),
            key,
        ))
    }

    /// Joins reaching the relation's table from the owner's table.
    pub fn forward_joins(&self) -> Vec<Join> {
        self.edges
            .iter()
            .map(|edge| {
                Join::inner(
                    edge.related_table(),
                    ColumnRef::qualified(edge.child_table.clone(), edge.child_column.clone()),
                    ColumnRef::qualified(edge.parent_table.clone(), edge.parent_column.clone()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Grammar;
    use pretty_assertions::assert_eq;
    use strata_schema::RelationOptions;

    fn blog_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.model("comment").field("body");
        catalog
            .model("article")
            .field("title")
            .has_many("comments", RelationOptions::new())
            .unwrap()
            .belongs_to("author", RelationOptions::new())
            .unwrap();
        catalog.model("author").field("name");
        catalog
            .model("blog")
            .has_many("articles", RelationOptions::new())
            .unwrap()
            .has_many("comments", RelationOptions::new().through("articles"))
            .unwrap();
        catalog
    }

    #[test]
    fn test_direct_fetch() {
        let mut catalog = blog_catalog();
        let path = JoinPath::resolve(&mut catalog, &RelationRef::new("article", "comments")).unwrap();
        assert!(!path.is_through());
        assert_eq!(path.root_column(), Some("id"));

        let stmt = Grammar::sqlite().select(&path.fetch_select(9.into()));
        assert_eq!(stmt.sql, r#"SELECT * FROM "comments" WHERE "article_id" = ?"#);
        assert_eq!(stmt.args, vec![FilterValue::Int(9)]);
    }

    #[test]
    fn test_through_fetch() {
        let mut catalog = blog_catalog();
        let path = JoinPath::resolve(&mut catalog, &RelationRef::new("blog", "comments")).unwrap();
        assert!(path.is_through());
        assert_eq!(path.target_model(), Some("comment"));
        assert_eq!(path.model_at(0), Some("article"));

        let stmt = Grammar::sqlite().select(&path.fetch_select(12.into()));
        assert_eq!(
            stmt.sql,
            r#"SELECT "comments".* FROM "comments" INNER JOIN "articles" ON "comments"."article_id" = "articles"."id" WHERE "articles"."blog_id" = ?"#
        );
        assert_eq!(stmt.args, vec![FilterValue::Int(12)]);
    }

    #[test]
    fn test_belongs_to_path() {
        let mut catalog = blog_catalog();
        let path = JoinPath::resolve(&mut catalog, &RelationRef::new("article", "author")).unwrap();
        assert!(path.is_to_one());
        assert_eq!(path.root_column(), Some("author_id"));

        let joins = path.forward_joins();
        assert_eq!(
            joins,
            vec![Join::inner(
                "authors",
                ColumnRef::qualified("articles", "author_id"),
                ColumnRef::qualified("authors", "id"),
            )]
        );
    }
}

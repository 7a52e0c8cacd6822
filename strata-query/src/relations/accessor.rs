//! Relation accessors on a single record.

use smol_str::SmolStr;
use strata_schema::inflection::pascal_case;
use strata_schema::{RelationKind, RelationRef};

use crate::database::Database;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::record::Record;

use super::join::JoinPath;

/// Mutations a relation accessor offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOp {
    Create,
    Add,
    Remove,
    Clear,
}

impl RelationOp {
    /// Operation name as it appears in errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Clear => "clear",
        }
    }
}

/// Fetches and mutates the records of one relation of one record.
///
/// Obtained from [`Database::relation`]. Through relations are read-only:
/// every mutation fails before any statement is executed.
#[derive(Debug)]
pub struct RelationHandle<'a> {
    db: &'a Database,
    owner: &'a Record,
    path: JoinPath,
    kind: RelationKind,
}

impl<'a> RelationHandle<'a> {
    pub(crate) fn new(db: &'a Database, owner: &'a Record, path: JoinPath, kind: RelationKind) -> Self {
        Self { db, owner, path, kind }
    }

    /// The relation being accessed.
    pub fn relation(&self) -> &RelationRef {
        self.path.relation()
    }

    /// Whether the relation is a through relation.
    pub fn is_through(&self) -> bool {
        self.path.is_through()
    }

    /// Fetch the related records.
    pub async fn fetch(&self) -> QueryResult<Vec<Record>> {
        let Some(key) = self.owner_key()? else {
            return Ok(Vec::new());
        };
        let model = self.target()?;
        let statement = self.db.grammar().select(&self.path.fetch_select(key));
        let result = self.db.execute(&statement).await?;
        Ok(result
            .rows
            .into_iter()
            .map(|row| Record::persisted(model, row))
            .collect())
    }

    /// Fetch the record of a belongs-to relation.
    pub async fn fetch_one(&self) -> QueryResult<Option<Record>> {
        if !self.path.is_to_one() {
            return Err(QueryError::cardinality(&self.relation().instance_name(), "belongs-to"));
        }
        Ok(self.fetch().await?.into_iter().next())
    }

    /// Create and save a related record linked to the owner.
    pub async fn create(&self, attrs: &[(&str, FilterValue)]) -> QueryResult<Record> {
        let (column, key) = self.mutation(RelationOp::Create)?;
        let mut record = self.db.build(self.target()?, attrs)?;
        record.set(column, key);
        self.db.save(&mut record).await?;
        Ok(record)
    }

    /// Link existing records to the owner and save them.
    pub async fn add(&self, records: &mut [Record]) -> QueryResult<()> {
        let (column, key) = self.mutation(RelationOp::Add)?;
        for record in records.iter_mut() {
            record.set(column.clone(), key.clone());
            self.db.save(record).await?;
        }
        Ok(())
    }

    /// Unlink records from the owner and save them.
    pub async fn remove(&self, records: &mut [Record]) -> QueryResult<()> {
        let (column, _) = self.mutation(RelationOp::Remove)?;
        for record in records.iter_mut() {
            record.set(column.clone(), FilterValue::Null);
            self.db.save(record).await?;
        }
        Ok(())
    }

    /// Unlink every record currently linked to the owner.
    pub async fn clear(&self) -> QueryResult<()> {
        let (column, key) = self.mutation(RelationOp::Clear)?;
        let Some(edge) = self.path.edges().first() else {
            return Ok(());
        };
        let statement = self.db.grammar().update(
            &edge.child_table,
            &[(column.clone(), FilterValue::Null)],
            &Filter::equals(column.as_str(), key),
        );
        self.db.execute(&statement).await?;
        Ok(())
    }

    /// Check that `op` is allowed and return the foreign key column and the
    /// owner's key value to write.
    fn mutation(&self, op: RelationOp) -> QueryResult<(SmolStr, FilterValue)> {
        if self.path.is_through() {
            return Err(QueryError::through_mutation(op.as_str(), &self.relation().instance_name()));
        }
        if self.kind != RelationKind::HasMany {
            return Err(QueryError::cardinality(&self.relation().instance_name(), "has-many")
                .with_context(op.as_str()));
        }
        let edge = self
            .path
            .edges()
            .first()
            .ok_or_else(|| QueryError::internal(format!("{} has no join edge", self.relation())))?;
        let key = self.owner_key()?.ok_or_else(|| {
            QueryError::missing_primary_key(op.as_str(), &pascal_case(self.owner.model()))
        })?;
        Ok((edge.child_column.clone(), key))
    }

    /// The owner's value for the first hop, `None` when it is null.
    fn owner_key(&self) -> QueryResult<Option<FilterValue>> {
        let column = self
            .path
            .root_column()
            .ok_or_else(|| QueryError::internal(format!("{} has no join edge", self.relation())))?;
        Ok(self.owner.get(column).filter(|v| !v.is_null()).cloned())
    }

    fn target(&self) -> QueryResult<&str> {
        self.path
            .target_model()
            .ok_or_else(|| QueryError::internal(format!("{} has no target model", self.relation())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_names() {
        let names: Vec<_> = [RelationOp::Create, RelationOp::Add, RelationOp::Remove, RelationOp::Clear]
            .iter()
            .map(RelationOp::as_str)
            .collect();
        assert_eq!(names, vec!["create", "add", "remove", "clear"]);
    }
}

//! Lazy relation configuration.
//!
//! Every derived key of a relation is computed on first access and frozen on
//! the relation descriptor. Computing one relation may read (and, for
//! inverses, synthesize) relations on other models, so all accessors take
//! `&mut Catalog`.

mod inverse;
mod strategy;
mod through;

use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::error::{SchemaError, SchemaResult};
use crate::relation::{ConfigField, RelationKind, RelationRef};

pub(crate) use strategy::{RelationStrategy, strategy_for};

/// One hop of a join path: how the tables of a direct relation connect.
///
/// The parent side holds the primary key, the child side the foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEdge {
    /// The relation this edge was derived from.
    pub relation: RelationRef,
    /// Kind of the relation.
    pub kind: RelationKind,
    /// Table holding the primary key.
    pub parent_table: SmolStr,
    /// Primary key column.
    pub parent_column: SmolStr,
    /// Table holding the foreign key.
    pub child_table: SmolStr,
    /// Foreign key column.
    pub child_column: SmolStr,
}

impl JoinEdge {
    /// Table of the relation's owner.
    pub fn owner_table(&self) -> &str {
        match self.kind {
            RelationKind::HasMany => &self.parent_table,
            RelationKind::BelongsTo => &self.child_table,
        }
    }

    /// Column on the owner's table this edge matches on.
    pub fn owner_column(&self) -> &str {
        match self.kind {
            RelationKind::HasMany => &self.parent_column,
            RelationKind::BelongsTo => &self.child_column,
        }
    }

    /// Table of the related model.
    pub fn related_table(&self) -> &str {
        match self.kind {
            RelationKind::HasMany => &self.child_table,
            RelationKind::BelongsTo => &self.parent_table,
        }
    }

    /// Column on the related table this edge matches on.
    pub fn related_column(&self) -> &str {
        match self.kind {
            RelationKind::HasMany => &self.child_column,
            RelationKind::BelongsTo => &self.parent_column,
        }
    }
}

impl Catalog {
    /// Name of the inverse relation on the related model. `None` for through
    /// relations.
    ///
    /// For `HasMany` relations a missing inverse is synthesized on the
    /// related model as an implicit `BelongsTo`.
    pub fn inverse(&mut self, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        self.memoized(r, ConfigField::Inverse, |catalog, r, strategy| {
            strategy.compute_inverse(catalog, r)
        })
    }

    /// Logical primary key attribute. `None` for through relations.
    pub fn primary_key(&mut self, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        self.memoized(r, ConfigField::PrimaryKey, |catalog, r, strategy| {
            strategy.compute_primary_key(catalog, r)
        })
    }

    /// Primary key column on the parent side. `None` for through relations.
    pub fn primary_key_attr(&mut self, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        self.memoized(r, ConfigField::PrimaryKeyAttr, |catalog, r, strategy| {
            strategy.compute_primary_key_attr(catalog, r)
        })
    }

    /// Logical foreign key attribute. `None` for through relations.
    pub fn foreign_key(&mut self, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        self.memoized(r, ConfigField::ForeignKey, |catalog, r, strategy| {
            strategy.compute_foreign_key(catalog, r)
        })
    }

    /// Foreign key column on the child side. `None` for through relations.
    pub fn foreign_key_attr(&mut self, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        self.memoized(r, ConfigField::ForeignKeyAttr, |catalog, r, strategy| {
            strategy.compute_foreign_key_attr(catalog, r)
        })
    }

    /// The inverse relation, if it exists on the related model. A `BelongsTo`
    /// only gets a `HasMany` that points back at it.
    pub fn inverse_relation(&mut self, r: &RelationRef) -> SchemaResult<Option<RelationRef>> {
        let Some(name) = self.inverse(r)? else {
            return Ok(None);
        };
        let relation = self.relation(r)?;
        let belongs_to = !relation.is_through() && relation.kind() == RelationKind::BelongsTo;
        let inverse = RelationRef::new(relation.related(), name);
        Ok(match self.relation(&inverse) {
            Ok(candidate) if !belongs_to || inverse::pairs_with_belongs_to(candidate, r) => Some(inverse),
            _ => None,
        })
    }

    /// Resolve every derived key of a relation and of its inverse.
    ///
    /// Runs at most once per relation. Through relations expand their chain.
    pub fn configure(&mut self, r: &RelationRef) -> SchemaResult<()> {
        let relation = self.relation_mut(r)?;
        if relation.configured {
            return Ok(());
        }
        relation.configured = true;

        let result = self.configure_fields(r);
        if result.is_err() {
            if let Ok(relation) = self.relation_mut(r) {
                relation.configured = false;
            }
        }
        result
    }

    fn configure_fields(&mut self, r: &RelationRef) -> SchemaResult<()> {
        if self.relation(r)?.is_through() {
            self.through_chain(r)?;
            return Ok(());
        }

        // The inverse goes first: the other keys may depend on it.
        self.inverse(r)?;
        self.primary_key(r)?;
        self.primary_key_attr(r)?;
        self.foreign_key(r)?;
        self.foreign_key_attr(r)?;

        if let Some(inverse) = self.inverse_relation(r)? {
            self.configure(&inverse)?;
        }

        debug!(relation = %r, "Configured relation");
        Ok(())
    }

    /// Configure every declared relation, including ones synthesized while
    /// configuring others.
    pub fn configure_all(&mut self) -> SchemaResult<()> {
        loop {
            let pending: Vec<RelationRef> = self
                .models()
                .flat_map(|m| m.relations())
                .filter(|rel| !rel.is_configured())
                .map(|rel| rel.to_ref())
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            for r in &pending {
                self.configure(r)?;
            }
        }
    }

    /// The join edge of a direct relation.
    pub fn join_edge(&mut self, r: &RelationRef) -> SchemaResult<JoinEdge> {
        let relation = self.relation(r)?;
        if relation.is_through() {
            return Err(SchemaError::invalid_through(
                r.qualified(),
                "a through relation has no direct join edge; use its join path",
            ));
        }
        let kind = relation.kind();
        let (parent_model, child_model) = match kind {
            RelationKind::HasMany => (relation.owner().to_string(), relation.related().to_string()),
            RelationKind::BelongsTo => (relation.related().to_string(), relation.owner().to_string()),
        };

        let parent_column = self.primary_key_attr(r)?.ok_or_else(|| missing_key(r, "primary key"))?;
        let child_column = self.foreign_key_attr(r)?.ok_or_else(|| missing_key(r, "foreign key"))?;

        Ok(JoinEdge {
            relation: r.clone(),
            kind,
            parent_table: SmolStr::new(self.get(&parent_model)?.table()),
            parent_column,
            child_table: SmolStr::new(self.get(&child_model)?.table()),
            child_column,
        })
    }

    /// Join edges for every direct hop of a relation, starting at its owner.
    pub fn join_path(&mut self, r: &RelationRef) -> SchemaResult<Vec<JoinEdge>> {
        let chain = self.through_chain(r)?;
        chain.iter().map(|hop| self.join_edge(hop)).collect()
    }

    /// The model a relation ultimately yields.
    pub fn target_model(&mut self, r: &RelationRef) -> SchemaResult<SmolStr> {
        let chain = self.through_chain(r)?;
        let last = chain.last().unwrap_or(r);
        Ok(SmolStr::new(self.relation(last)?.related()))
    }

    /// Read a memoized field or compute and freeze it.
    fn memoized<F>(&mut self, r: &RelationRef, field: ConfigField, compute: F) -> SchemaResult<Option<SmolStr>>
    where
        F: FnOnce(&mut Catalog, &RelationRef, &'static dyn RelationStrategy) -> SchemaResult<Option<SmolStr>>,
    {
        let relation = self.relation(r)?;
        if let Some(value) = relation.resolved.get(field) {
            trace!(relation = %r, field = field.as_str(), "Relation config cache hit");
            return Ok(Some(value.clone()));
        }
        let strategy = strategy_for(relation);

        let key = (r.clone(), field);
        if self.in_progress.contains(&key) {
            return Err(SchemaError::ConfigError {
                message: format!("{r} {} depends on itself", field.as_str()),
            });
        }
        self.in_progress.push(key);
        let result = compute(self, r, strategy);
        self.in_progress.pop();

        let value = result?;
        if let Some(value) = &value {
            trace!(relation = %r, field = field.as_str(), value = %value, "Resolved relation config");
            self.relation_mut(r)?.resolved.freeze(field, value.clone());
        }
        Ok(value)
    }
}

fn missing_key(r: &RelationRef, what: &str) -> SchemaError {
    SchemaError::ConfigError {
        message: format!("{r} has no {what}"),
    }
}

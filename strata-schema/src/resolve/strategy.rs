//! Per-kind computation of relation keys.

use smol_str::SmolStr;

use crate::catalog::Catalog;
use crate::error::{SchemaError, SchemaResult};
use crate::inflection;
use crate::model::{Model, PRIMARY_KEY_ALIAS};
use crate::relation::{Relation, RelationKind, RelationRef};

use super::inverse;

/// Computes the derived configuration of one kind of relation.
///
/// Implementations never cache; [`Catalog`] memoizes every value they return.
pub(crate) trait RelationStrategy: Sync {
    /// Model holding the primary key, `None` when the relation has no keys.
    fn parent_model<'r>(&self, relation: &'r Relation) -> Option<&'r str>;

    /// Model holding the foreign key, `None` when the relation has no keys.
    fn child_model<'r>(&self, relation: &'r Relation) -> Option<&'r str>;

    fn compute_inverse(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>>;

    fn compute_foreign_key(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>>;

    fn compute_primary_key(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        let relation = catalog.relation(r)?;
        if self.parent_model(relation).is_none() {
            return Ok(None);
        }
        Ok(Some(
            relation
                .options()
                .primary_key
                .clone()
                .unwrap_or_else(|| SmolStr::new_static(PRIMARY_KEY_ALIAS)),
        ))
    }

    fn compute_primary_key_attr(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        let Some(key) = catalog.primary_key(r)? else {
            return Ok(None);
        };
        let relation = catalog.relation(r)?;
        let Some(parent) = self.parent_model(relation) else {
            return Ok(None);
        };
        Ok(Some(column_for(catalog.get(parent)?, &key)))
    }

    fn compute_foreign_key_attr(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        let Some(key) = catalog.foreign_key(r)? else {
            return Ok(None);
        };
        let relation = catalog.relation(r)?;
        let Some(child) = self.child_model(relation) else {
            return Ok(None);
        };
        Ok(Some(column_for(catalog.get(child)?, &key)))
    }
}

/// The declared column for `key`, else its snake case.
fn column_for(model: &Model, key: &str) -> SmolStr {
    model
        .column_for(key)
        .map(SmolStr::new)
        .unwrap_or_else(|| SmolStr::new(inflection::snake_case(key)))
}

pub(crate) struct BelongsToStrategy;
pub(crate) struct HasManyStrategy;
pub(crate) struct ThroughStrategy;

/// Pick the strategy for a relation.
pub(crate) fn strategy_for(relation: &Relation) -> &'static dyn RelationStrategy {
    match (relation.is_through(), relation.kind()) {
        (true, _) => &ThroughStrategy,
        (false, RelationKind::BelongsTo) => &BelongsToStrategy,
        (false, RelationKind::HasMany) => &HasManyStrategy,
    }
}

impl RelationStrategy for BelongsToStrategy {
    fn parent_model<'r>(&self, relation: &'r Relation) -> Option<&'r str> {
        Some(relation.related())
    }

    fn child_model<'r>(&self, relation: &'r Relation) -> Option<&'r str> {
        Some(relation.owner())
    }

    fn compute_inverse(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        inverse::belongs_to_inverse(catalog, r).map(Some)
    }

    /// The explicit option, else the inverse's explicit option, else
    /// `<name>Id`. Two explicit values must agree.
    fn compute_foreign_key(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        let explicit = catalog.relation(r)?.options().foreign_key.clone();
        let inverse_ref = catalog.inverse_relation(r)?;

        let mut from_inverse = None;
        if let Some(inverse_ref) = &inverse_ref {
            let inverse = catalog.relation(inverse_ref)?;
            if !inverse.is_through() && inverse.kind() == RelationKind::HasMany {
                from_inverse = inverse.options().foreign_key.clone();
            }
        }

        if let (Some(explicit), Some(inverse_fk), Some(inverse_ref)) = (&explicit, &from_inverse, &inverse_ref) {
            if explicit != inverse_fk {
                return Err(SchemaError::foreign_key_mismatch(
                    r.qualified(),
                    explicit.as_str(),
                    inverse_ref.qualified(),
                    inverse_fk.as_str(),
                ));
            }
        }

        Ok(Some(
            explicit
                .or(from_inverse)
                .unwrap_or_else(|| SmolStr::new(inflection::foreign_key_for(&r.name))),
        ))
    }
}

impl RelationStrategy for HasManyStrategy {
    fn parent_model<'r>(&self, relation: &'r Relation) -> Option<&'r str> {
        Some(relation.owner())
    }

    fn child_model<'r>(&self, relation: &'r Relation) -> Option<&'r str> {
        Some(relation.related())
    }

    fn compute_inverse(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        inverse::has_many_inverse(catalog, r).map(Some)
    }

    /// The inverse's foreign key is authoritative. An explicit option that
    /// disagrees with it is a configuration error.
    fn compute_foreign_key(&self, catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        let explicit = catalog.relation(r)?.options().foreign_key.clone();
        let inverse_name = catalog.inverse(r)?;

        let mut from_inverse = None;
        if let Some(inverse_ref) = catalog.inverse_relation(r)? {
            let inverse = catalog.relation(&inverse_ref)?;
            if !inverse.is_through() && inverse.kind() == RelationKind::BelongsTo {
                from_inverse = catalog.foreign_key(&inverse_ref)?;
            }
            if let (Some(explicit), Some(inverse_fk)) = (&explicit, &from_inverse) {
                if explicit != inverse_fk {
                    return Err(SchemaError::foreign_key_mismatch(
                        r.qualified(),
                        explicit.as_str(),
                        inverse_ref.qualified(),
                        inverse_fk.as_str(),
                    ));
                }
            }
        }

        let default = || {
            let base = inverse_name.as_deref().unwrap_or(r.model.as_str());
            SmolStr::new(inflection::foreign_key_for(base))
        };
        Ok(Some(from_inverse.or(explicit).unwrap_or_else(default)))
    }
}

/// Through relations have no keys or inverse of their own.
impl RelationStrategy for ThroughStrategy {
    fn parent_model<'r>(&self, _relation: &'r Relation) -> Option<&'r str> {
        None
    }

    fn child_model<'r>(&self, _relation: &'r Relation) -> Option<&'r str> {
        None
    }

    fn compute_inverse(&self, _catalog: &mut Catalog, _r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        Ok(None)
    }

    fn compute_foreign_key(&self, _catalog: &mut Catalog, _r: &RelationRef) -> SchemaResult<Option<SmolStr>> {
        Ok(None)
    }
}

//! Inverse relation lookup and synthesis.

use smol_str::SmolStr;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::SchemaResult;
use crate::inflection;
use crate::relation::{Relation, RelationKind, RelationOptions, RelationRef};

/// Inverse of a `HasMany` relation `A.r -> B`.
///
/// Uses the explicit option, else the singular camel case of `A` when `B` has
/// it, else the `B` relation whose `inverse` option names `r`, else the
/// singular camel case of `A`. When `B` lacks the chosen relation an implicit
/// `BelongsTo` back to `A` is added to `B`, carrying `r`'s key options.
pub(super) fn has_many_inverse(catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<SmolStr> {
    let relation = catalog.relation(r)?;
    let explicit = relation.options().inverse.clone();
    let options = relation.options().clone();
    let related = SmolStr::new(relation.related());
    let owner = r.model.clone();

    let related_model = catalog.get(&related)?;
    let inverse = match explicit {
        Some(name) => name,
        None => {
            let candidate = SmolStr::new(inflection::camel_case(&inflection::singularize(&owner)));
            if related_model.has_relation(&candidate) {
                candidate
            } else {
                related_model
                    .relations()
                    .find(|rel| {
                        rel.options().inverse.as_deref() == Some(r.name.as_str())
                            && rel.related() == owner.as_str()
                    })
                    .map(|rel| SmolStr::new(rel.name()))
                    .unwrap_or(candidate)
            }
        }
    };

    if !related_model.has_relation(&inverse) {
        let mut belongs_to = RelationOptions::new().model(owner.clone()).inverse(r.name.clone());
        belongs_to.primary_key = options.primary_key;
        belongs_to.foreign_key = options.foreign_key;
        catalog.synthesize(&related, &inverse, RelationKind::BelongsTo, belongs_to)?;
        debug!(relation = %r, inverse = %inverse, "Added implicit inverse");
    }

    Ok(inverse)
}

/// Inverse of a `BelongsTo` relation `A.r -> B`.
///
/// Uses the explicit option, else the plural camel case of `A` when `B` has
/// it and it [pairs](pairs_with_belongs_to) with `r`, else the `B` relation
/// whose `inverse` option names `r`, else the plural camel case of `A`. Never
/// synthesizes anything.
pub(super) fn belongs_to_inverse(catalog: &mut Catalog, r: &RelationRef) -> SchemaResult<SmolStr> {
    let relation = catalog.relation(r)?;
    if let Some(inverse) = &relation.options().inverse {
        return Ok(inverse.clone());
    }
    let related = catalog.get(relation.related())?;

    let candidate = SmolStr::new(inflection::camel_case(&inflection::pluralize(&r.model)));
    if related.relation(&candidate).is_some_and(|rel| pairs_with_belongs_to(rel, r)) {
        return Ok(candidate);
    }

    Ok(related
        .relations()
        .find(|rel| {
            rel.options().inverse.as_deref() == Some(r.name.as_str()) && pairs_with_belongs_to(rel, r)
        })
        .map(|rel| SmolStr::new(rel.name()))
        .unwrap_or(candidate))
}

/// Whether `candidate` can be the inverse of the `BelongsTo` relation `r`: a
/// direct `HasMany` back to `r`'s model whose own `inverse` option, if any,
/// names `r`.
pub(super) fn pairs_with_belongs_to(candidate: &Relation, r: &RelationRef) -> bool {
    !candidate.is_through()
        && candidate.kind() == RelationKind::HasMany
        && candidate.related() == r.model.as_str()
        && candidate
            .options()
            .inverse
            .as_deref()
            .is_none_or(|inverse| inverse == r.name.as_str())
}

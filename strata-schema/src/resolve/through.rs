//! Through-relation expansion.

use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::error::{SchemaError, SchemaResult};
use crate::inflection;
use crate::relation::{ConfigField, RelationKind, RelationOptions, RelationRef};

impl Catalog {
    /// The ordered direct relations a relation is composed of.
    ///
    /// A direct relation is its own one-hop chain. A through relation expands
    /// to the chain of its intermediate followed by the chain of its terminal
    /// relation on the intermediate's target. The result is cached on the
    /// relation.
    pub fn through_chain(&mut self, r: &RelationRef) -> SchemaResult<Vec<RelationRef>> {
        let relation = self.relation(r)?;
        if !relation.is_through() {
            return Ok(vec![r.clone()]);
        }
        if let Some(chain) = &relation.resolved.through_chain {
            trace!(relation = %r, "Through chain cache hit");
            return Ok(chain.clone());
        }

        let key = (r.clone(), ConfigField::ThroughChain);
        if let Some(start) = self.in_progress.iter().position(|entry| entry == &key) {
            let mut path: Vec<String> = self.in_progress[start..]
                .iter()
                .filter(|(_, field)| *field == ConfigField::ThroughChain)
                .map(|(hop, _)| hop.qualified())
                .collect();
            path.push(r.qualified());
            return Err(SchemaError::CyclicThrough {
                relation: r.qualified(),
                path: path.join(" -> "),
            });
        }

        self.in_progress.push(key);
        let result = self.expand_through(r);
        self.in_progress.pop();
        let chain = result?;

        debug!(
            relation = %r,
            hops = chain.len(),
            chain = %chain.iter().map(RelationRef::qualified).collect::<Vec<_>>().join(" -> "),
            "Expanded through relation"
        );
        self.relation_mut(r)?.resolved.through_chain = Some(chain.clone());
        Ok(chain)
    }

    fn expand_through(&mut self, r: &RelationRef) -> SchemaResult<Vec<RelationRef>> {
        let relation = self.relation(r)?;
        let options = relation.options().clone();
        let declared_target = SmolStr::new(relation.related());
        let Some(through) = options.through else {
            return Ok(vec![r.clone()]);
        };

        let intermediate = RelationRef::new(r.model.clone(), through.clone());
        if !self.get(&r.model)?.has_relation(&through) {
            self.synthesize(&r.model, &through, RelationKind::HasMany, RelationOptions::new())?;
        }
        self.configure(&intermediate)?;
        let mut chain = self.through_chain(&intermediate)?;

        let via = self.target_model(&intermediate)?;
        let terminal = self.source_relation(r, &via, options.source.as_deref(), &declared_target)?;
        self.configure(&terminal)?;
        chain.extend(self.through_chain(&terminal)?);

        for (i, hop) in chain.iter().enumerate() {
            if chain[..i].contains(hop) {
                return Err(SchemaError::CyclicThrough {
                    relation: r.qualified(),
                    path: chain.iter().map(RelationRef::qualified).collect::<Vec<_>>().join(" -> "),
                });
            }
        }

        Ok(chain)
    }

    /// Find the terminal relation of `r` on the intermediate target `via`.
    ///
    /// Tries the source name (or `r`'s own name), then its singular. Without
    /// an explicit source, falls back to the single relation on `via` whose
    /// related model is `r`'s declared target.
    fn source_relation(
        &self,
        r: &RelationRef,
        via: &str,
        source: Option<&str>,
        declared_target: &str,
    ) -> SchemaResult<RelationRef> {
        let model = self.get(via)?;
        let name = source.unwrap_or(r.name.as_str());

        let singular = inflection::singularize(name);
        for candidate in [name, singular.as_str()] {
            if model.has_relation(candidate) {
                return Ok(RelationRef::new(via, candidate));
            }
        }

        let missing = || SchemaError::MissingSource {
            relation: r.qualified(),
            model: model.class_name(),
            source_name: name.to_string(),
        };
        if source.is_some() {
            return Err(missing());
        }

        let candidates: Vec<&str> = model
            .relations()
            .filter(|rel| rel.related() == declared_target && rel.to_ref() != *r)
            .map(|rel| rel.name())
            .collect();
        match candidates.as_slice() {
            [] => Err(missing()),
            [only] => Ok(RelationRef::new(via, *only)),
            _ => Err(SchemaError::AmbiguousSource {
                relation: r.qualified(),
                model: model.class_name(),
                target: inflection::pascal_case(declared_target),
                candidates: candidates.join(", "),
            }),
        }
    }
}

//! The model registry.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::config::{NamingConfig, StrataConfig};
use crate::error::{SchemaError, SchemaResult};
use crate::inflection::pascal_case;
use crate::model::Model;
use crate::relation::{
    ConfigField, Relation, RelationKind, RelationOptions, RelationRef, ResolvedConfig,
};

/// Owns every [`Model`] for its lifetime.
///
/// Models refer to each other by name only, so they can be declared in any
/// order. Relation configuration is derived lazily through the methods in
/// [`crate::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    naming: NamingConfig,
    models: IndexMap<SmolStr, Model>,
    /// Relation fields currently being computed, innermost last.
    pub(crate) in_progress: Vec<(RelationRef, ConfigField)>,
}

impl Catalog {
    /// Create an empty catalog with default naming.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty catalog with the given naming conventions.
    pub fn with_naming(naming: NamingConfig) -> Self {
        Self {
            naming,
            ..Self::default()
        }
    }

    /// Create an empty catalog from a loaded configuration.
    pub fn from_config(config: &StrataConfig) -> Self {
        Self::with_naming(config.naming.clone())
    }

    /// Naming conventions in effect.
    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    /// Declare a model, or reopen it if it already exists.
    pub fn model(&mut self, name: &str) -> ModelBuilder<'_> {
        if !self.models.contains_key(name) {
            let model = Model::new(name, &self.naming);
            self.models.insert(SmolStr::new(name), model);
        }
        ModelBuilder {
            catalog: self,
            model: SmolStr::new(name),
        }
    }

    /// Look up a model.
    pub fn get(&self, name: &str) -> SchemaResult<&Model> {
        self.models
            .get(name)
            .ok_or_else(|| SchemaError::unknown_model(name))
    }

    /// Look up a model by name, returning `None` when absent.
    pub fn find(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// All declared models in declaration order.
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Look up a relation.
    pub fn relation(&self, r: &RelationRef) -> SchemaResult<&Relation> {
        self.get(&r.model)?
            .relation(&r.name)
            .ok_or_else(|| SchemaError::unknown_relation(pascal_case(&r.model), r.name.as_str()))
    }

    pub(crate) fn relation_mut(&mut self, r: &RelationRef) -> SchemaResult<&mut Relation> {
        let model = self
            .models
            .get_mut(r.model.as_str())
            .ok_or_else(|| SchemaError::unknown_model(r.model.as_str()))?;
        model.relation_mut(&r.name).ok_or_else(|| {
            SchemaError::unknown_relation(pascal_case(&r.model), r.name.as_str())
        })
    }

    /// Add a relation the catalog derived on its own.
    pub(crate) fn synthesize(
        &mut self,
        model: &str,
        name: &str,
        kind: RelationKind,
        options: RelationOptions,
    ) -> SchemaResult<RelationRef> {
        let target = self
            .models
            .get_mut(model)
            .ok_or_else(|| SchemaError::unknown_model(model))?;
        let relation = Relation::new(model, name, kind, options.implicit());
        debug!(
            model = %model,
            relation = %name,
            kind = %kind,
            related = %relation.related(),
            "Synthesized implicit relation"
        );
        let r = relation.to_ref();
        target.add_relation(relation);
        Ok(r)
    }

    fn declare(&mut self, model: &str, relation: Relation) -> SchemaResult<()> {
        let target = self
            .models
            .get_mut(model)
            .ok_or_else(|| SchemaError::unknown_model(model))?;
        if let Some(existing) = target.relation(relation.name()) {
            // Explicit declarations may replace a synthesized relation that
            // nothing has resolved yet.
            let untouched = existing.is_implicit() && existing.resolved() == &ResolvedConfig::default();
            if !untouched {
                return Err(SchemaError::duplicate("relation", relation.to_ref().qualified()));
            }
        }
        target.add_relation(relation);
        Ok(())
    }
}

/// Declares attributes and relations on one model.
///
/// ```rust
/// use strata_schema::{Catalog, RelationOptions};
///
/// let mut catalog = Catalog::new();
/// catalog.model("user").attr("username", "username");
/// catalog
///     .model("blog")
///     .belongs_to("owner", RelationOptions::new().model("user"))
///     .unwrap();
/// ```
pub struct ModelBuilder<'a> {
    catalog: &'a mut Catalog,
    model: SmolStr,
}

impl<'a> ModelBuilder<'a> {
    /// Declare an attribute mapped to a column.
    pub fn attr(self, name: &str, column: &str) -> Self {
        if let Some(model) = self.catalog.models.get_mut(self.model.as_str()) {
            model.add_attribute(name, column);
        }
        self
    }

    /// Declare an attribute whose column is the snake case of its name.
    pub fn field(self, name: &str) -> Self {
        let column = crate::inflection::snake_case(name);
        self.attr(name, &column)
    }

    /// Set an explicit table name.
    pub fn table(self, table: &str) -> Self {
        if let Some(model) = self.catalog.models.get_mut(self.model.as_str()) {
            model.set_table(table);
        }
        self
    }

    /// Set the primary key attribute.
    pub fn primary_key(self, attr: &str) -> Self {
        if let Some(model) = self.catalog.models.get_mut(self.model.as_str()) {
            model.set_primary_key(attr);
        }
        self
    }

    /// Declare a `BelongsTo` relation.
    pub fn belongs_to(self, name: &str, options: RelationOptions) -> SchemaResult<Self> {
        self.relation(name, RelationKind::BelongsTo, options)
    }

    /// Declare a `HasMany` relation.
    pub fn has_many(self, name: &str, options: RelationOptions) -> SchemaResult<Self> {
        self.relation(name, RelationKind::HasMany, options)
    }

    fn relation(self, name: &str, kind: RelationKind, options: RelationOptions) -> SchemaResult<Self> {
        if options.through.is_some() && kind == RelationKind::BelongsTo {
            return Err(SchemaError::invalid_through(
                RelationRef::new(self.model.as_str(), name).qualified(),
                "only has_many relations can be declared through another relation",
            ));
        }
        if options.through.as_deref() == Some(name) {
            return Err(SchemaError::CyclicThrough {
                relation: RelationRef::new(self.model.as_str(), name).qualified(),
                path: format!("{name} -> {name}"),
            });
        }
        let relation = Relation::new(self.model.clone(), name, kind, options);
        self.catalog.declare(&self.model, relation)?;
        Ok(self)
    }

    /// Name of the model being declared.
    pub fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_reopen() {
        let mut catalog = Catalog::new();
        catalog.model("user").attr("username", "username");
        catalog
            .model("user")
            .has_many("blogs", RelationOptions::new())
            .unwrap();

        let user = catalog.get("user").unwrap();
        assert!(user.has_attribute("username"));
        assert!(user.has_relation("blogs"));
        assert_eq!(user.relation("blogs").unwrap().related(), "blog");
    }

    #[test]
    fn test_duplicate_relation() {
        let mut catalog = Catalog::new();
        catalog
            .model("user")
            .has_many("blogs", RelationOptions::new())
            .unwrap();
        let err = catalog
            .model("user")
            .has_many("blogs", RelationOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
        assert!(err.to_string().contains("User.blogs"));
    }

    #[test]
    fn test_belongs_to_through_rejected() {
        let mut catalog = Catalog::new();
        let err = catalog
            .model("comment")
            .belongs_to("site", RelationOptions::new().through("article"))
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::InvalidThrough { .. }));
    }

    #[test]
    fn test_self_through_rejected() {
        let mut catalog = Catalog::new();
        let err = catalog
            .model("site")
            .has_many("comments", RelationOptions::new().through("comments"))
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::CyclicThrough { .. }));
    }

    #[test]
    fn test_unknown_lookups() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.get("ghost"),
            Err(SchemaError::UnknownModel { .. })
        ));
        assert!(catalog.find("ghost").is_none());
    }

    #[test]
    fn test_from_config_naming() {
        let config = StrataConfig::from_str(
            r#"
            [naming]
            table_prefix = "t_"
        "#,
        )
        .unwrap();
        let mut catalog = Catalog::from_config(&config);
        catalog.model("user");
        assert_eq!(catalog.get("user").unwrap().table(), "t_users");
    }
}

//! Relation descriptors.

use std::fmt;

use smol_str::SmolStr;

use crate::inflection;

/// The kind of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The owner holds a foreign key referencing the related model.
    BelongsTo,
    /// The related model holds a foreign key referencing the owner.
    HasMany,
}

impl RelationKind {
    /// Whether the relation yields at most one record.
    pub fn is_to_one(&self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelongsTo => write!(f, "belongs_to"),
            Self::HasMany => write!(f, "has_many"),
        }
    }
}

/// Options given when declaring a relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationOptions {
    /// Related model name, when it differs from the default derived from the
    /// relation name.
    pub model: Option<SmolStr>,
    /// Name of the inverse relation on the related model.
    pub inverse: Option<SmolStr>,
    /// Logical primary key attribute on the parent side.
    pub primary_key: Option<SmolStr>,
    /// Logical foreign key attribute on the child side.
    pub foreign_key: Option<SmolStr>,
    /// Intermediate relation this relation is composed through.
    pub through: Option<SmolStr>,
    /// Terminal relation to follow on the intermediate model.
    pub source: Option<SmolStr>,
    /// Set on relations the catalog synthesized itself.
    pub implicit: bool,
}

impl RelationOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the related model.
    pub fn model(mut self, model: impl Into<SmolStr>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the inverse relation name.
    pub fn inverse(mut self, inverse: impl Into<SmolStr>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Set the primary key attribute.
    pub fn primary_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    /// Set the foreign key attribute.
    pub fn foreign_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }

    /// Compose this relation through another relation on the same model.
    pub fn through(mut self, through: impl Into<SmolStr>) -> Self {
        self.through = Some(through.into());
        self
    }

    /// Set the terminal relation name followed on the intermediate model.
    pub fn source(mut self, source: impl Into<SmolStr>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn implicit(mut self) -> Self {
        self.implicit = true;
        self
    }
}

/// Identifies a relation by owning model and relation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationRef {
    /// Owning model name.
    pub model: SmolStr,
    /// Relation name.
    pub name: SmolStr,
}

impl RelationRef {
    /// Create a relation reference.
    pub fn new(model: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
        }
    }

    /// `Class.relation`, used in configuration errors.
    pub fn qualified(&self) -> String {
        format!("{}.{}", inflection::pascal_case(&self.model), self.name)
    }

    /// `Class#relation`, used in usage errors.
    pub fn instance_name(&self) -> String {
        format!("{}#{}", inflection::pascal_case(&self.model), self.name)
    }
}

impl fmt::Display for RelationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// Derived relation configuration.
///
/// Each field is computed at most once. Once set it never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub(crate) inverse: Option<SmolStr>,
    pub(crate) primary_key: Option<SmolStr>,
    pub(crate) primary_key_attr: Option<SmolStr>,
    pub(crate) foreign_key: Option<SmolStr>,
    pub(crate) foreign_key_attr: Option<SmolStr>,
    pub(crate) through_chain: Option<Vec<RelationRef>>,
}

/// Memoized key fields of a [`ResolvedConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ConfigField {
    Inverse,
    PrimaryKey,
    PrimaryKeyAttr,
    ForeignKey,
    ForeignKeyAttr,
    ThroughChain,
}

impl ConfigField {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Inverse => "inverse",
            Self::PrimaryKey => "primary_key",
            Self::PrimaryKeyAttr => "primary_key_attr",
            Self::ForeignKey => "foreign_key",
            Self::ForeignKeyAttr => "foreign_key_attr",
            Self::ThroughChain => "through_chain",
        }
    }
}

impl ResolvedConfig {
    pub(crate) fn get(&self, field: ConfigField) -> Option<&SmolStr> {
        match field {
            ConfigField::Inverse => self.inverse.as_ref(),
            ConfigField::PrimaryKey => self.primary_key.as_ref(),
            ConfigField::PrimaryKeyAttr => self.primary_key_attr.as_ref(),
            ConfigField::ForeignKey => self.foreign_key.as_ref(),
            ConfigField::ForeignKeyAttr => self.foreign_key_attr.as_ref(),
            ConfigField::ThroughChain => None,
        }
    }

    /// Store a computed value. A field that is already set keeps its value.
    pub(crate) fn freeze(&mut self, field: ConfigField, value: SmolStr) {
        let slot = match field {
            ConfigField::Inverse => &mut self.inverse,
            ConfigField::PrimaryKey => &mut self.primary_key,
            ConfigField::PrimaryKeyAttr => &mut self.primary_key_attr,
            ConfigField::ForeignKey => &mut self.foreign_key,
            ConfigField::ForeignKeyAttr => &mut self.foreign_key_attr,
            ConfigField::ThroughChain => return,
        };
        slot.get_or_insert(value);
    }
}

/// A relation declared on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    name: SmolStr,
    owner: SmolStr,
    kind: RelationKind,
    related: SmolStr,
    options: RelationOptions,
    pub(crate) resolved: ResolvedConfig,
    pub(crate) configured: bool,
}

impl Relation {
    /// Create a relation. The related model defaults to `name` for
    /// `BelongsTo` and to the singular of `name` for `HasMany`.
    pub fn new(
        owner: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        kind: RelationKind,
        options: RelationOptions,
    ) -> Self {
        let name = name.into();
        let related = match (&options.model, kind) {
            (Some(model), _) => model.clone(),
            (None, RelationKind::BelongsTo) => name.clone(),
            (None, RelationKind::HasMany) => SmolStr::new(inflection::singularize(&name)),
        };
        Self {
            name,
            owner: owner.into(),
            kind,
            related,
            options,
            resolved: ResolvedConfig::default(),
            configured: false,
        }
    }

    /// Relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning model name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Relation kind.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Declared related model name. For through relations the effective
    /// target is the terminal of the through chain.
    pub fn related(&self) -> &str {
        &self.related
    }

    /// Declared options.
    pub fn options(&self) -> &RelationOptions {
        &self.options
    }

    /// Whether this relation is composed through another one.
    pub fn is_through(&self) -> bool {
        self.options.through.is_some()
    }

    /// Whether the catalog synthesized this relation.
    pub fn is_implicit(&self) -> bool {
        self.options.implicit
    }

    /// Whether [`crate::Catalog::configure`] has run for this relation.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Reference to this relation.
    pub fn to_ref(&self) -> RelationRef {
        RelationRef::new(self.owner.clone(), self.name.clone())
    }

    /// The resolved configuration computed so far.
    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }
}

impl ResolvedConfig {
    /// Resolved inverse relation name, if computed.
    pub fn inverse(&self) -> Option<&str> {
        self.inverse.as_deref()
    }

    /// Resolved foreign key, if computed.
    pub fn foreign_key(&self) -> Option<&str> {
        self.foreign_key.as_deref()
    }

    /// Resolved through chain, if computed.
    pub fn through_chain(&self) -> Option<&[RelationRef]> {
        self.through_chain.as_deref()
    }
}

//! Model schemas.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::config::NamingConfig;
use crate::inflection;
use crate::relation::Relation;

/// Logical attribute name that always refers to the primary key.
pub const PRIMARY_KEY_ALIAS: &str = "pk";

/// A named entity type with attributes and relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    name: SmolStr,
    table: SmolStr,
    primary_key: SmolStr,
    /// Logical attribute name -> column name.
    attributes: IndexMap<SmolStr, SmolStr>,
    relations: IndexMap<SmolStr, Relation>,
}

impl Model {
    /// Create a model using the given naming conventions.
    pub fn new(name: impl Into<SmolStr>, naming: &NamingConfig) -> Self {
        let name = name.into();
        let table = format!(
            "{}{}",
            naming.table_prefix,
            inflection::pluralize(&inflection::snake_case(&name))
        );
        let primary_key = SmolStr::new(&naming.primary_key);
        let mut attributes = IndexMap::new();
        attributes.insert(primary_key.clone(), primary_key.clone());

        Self {
            name,
            table: SmolStr::new(table),
            primary_key,
            attributes,
            relations: IndexMap::new(),
        }
    }

    /// Model name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `PascalCase` class name (`blog_post` -> `BlogPost`).
    pub fn class_name(&self) -> String {
        inflection::pascal_case(&self.name)
    }

    /// Database table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Logical name of the primary key attribute.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Column storing the primary key.
    pub fn primary_key_column(&self) -> &str {
        self.attributes
            .get(&self.primary_key)
            .map(SmolStr::as_str)
            .unwrap_or(&self.primary_key)
    }

    /// Column for a declared attribute. `pk` resolves to the primary key
    /// column unless an attribute named `pk` is declared.
    pub fn column_for(&self, attr: &str) -> Option<&str> {
        match self.attributes.get(attr) {
            Some(column) => Some(column.as_str()),
            None if attr == PRIMARY_KEY_ALIAS => Some(self.primary_key_column()),
            None => None,
        }
    }

    /// Whether `attr` is a declared attribute (or the `pk` alias).
    pub fn has_attribute(&self, attr: &str) -> bool {
        self.column_for(attr).is_some()
    }

    /// Declared attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    /// Logical attribute name for a column, if one is declared.
    pub fn attribute_for_column(&self, column: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map(|(a, _)| a.as_str())
    }

    /// Get a relation by name.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub(crate) fn relation_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.get_mut(name)
    }

    /// Declared relations in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Whether a relation is declared.
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub(crate) fn set_table(&mut self, table: impl Into<SmolStr>) {
        self.table = table.into();
    }

    pub(crate) fn set_primary_key(&mut self, attr: impl Into<SmolStr>) {
        let attr = attr.into();
        self.replace_primary_key(attr.clone());
        if !self.attributes.contains_key(&attr) {
            let column = SmolStr::new(inflection::snake_case(&attr));
            self.attributes.insert(attr, column);
        }
    }

    pub(crate) fn add_attribute(&mut self, attr: impl Into<SmolStr>, column: impl Into<SmolStr>) {
        let attr = attr.into();
        // An explicit `pk` declaration is the primary key.
        if attr == PRIMARY_KEY_ALIAS {
            self.replace_primary_key(attr.clone());
        }
        self.attributes.insert(attr, column.into());
    }

    /// Swap the primary key, dropping the implicit attribute of the old one.
    fn replace_primary_key(&mut self, attr: SmolStr) {
        let old = std::mem::replace(&mut self.primary_key, attr);
        if old != self.primary_key && self.attributes.get(&old) == Some(&old) {
            self.attributes.shift_remove(&old);
        }
    }

    pub(crate) fn add_relation(&mut self, relation: Relation) {
        self.relations.insert(SmolStr::new(relation.name()), relation);
    }
}

//! Materialized records and their eager-load cache.

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use strata_schema::inflection::pascal_case;

use crate::adapter::Row;
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;

/// Records attached to a relation by eager loading.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// A has-many or through relation.
    Many(Vec<Record>),
    /// A belongs-to relation; `None` when the foreign key matched nothing.
    One(Option<Box<Record>>),
}

/// One row of a model.
///
/// Attributes are keyed by column name. Relations are only readable after
/// they have been loaded with `with(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: SmolStr,
    attrs: IndexMap<SmolStr, FilterValue>,
    dirty: IndexSet<SmolStr>,
    persisted: bool,
    relations: IndexMap<SmolStr, Loaded>,
}

impl Record {
    /// A new, unsaved record.
    pub fn new(model: impl Into<SmolStr>) -> Self {
        Self {
            model: model.into(),
            attrs: IndexMap::new(),
            dirty: IndexSet::new(),
            persisted: false,
            relations: IndexMap::new(),
        }
    }

    /// A record loaded from the database.
    pub fn persisted(model: impl Into<SmolStr>, row: Row) -> Self {
        Self {
            attrs: row,
            persisted: true,
            ..Self::new(model)
        }
    }

    /// Name of the record's model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Value of a column.
    pub fn get(&self, column: &str) -> Option<&FilterValue> {
        self.attrs.get(column)
    }

    /// Set a column value, marking it dirty.
    pub fn set(&mut self, column: impl Into<SmolStr>, value: impl Into<FilterValue>) {
        let column = column.into();
        self.dirty.insert(column.clone());
        self.attrs.insert(column, value.into());
    }

    /// All column values.
    pub fn attrs(&self) -> &IndexMap<SmolStr, FilterValue> {
        &self.attrs
    }

    /// Whether the record exists in the database.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Whether any column changed since the last save.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Columns changed since the last save, in change order.
    pub fn dirty_columns(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(SmolStr::as_str)
    }

    /// Records loaded for a to-many relation.
    pub fn related(&self, name: &str) -> QueryResult<&[Record]> {
        match self.relations.get(name) {
            Some(Loaded::Many(records)) => Ok(records),
            Some(Loaded::One(_)) => Err(QueryError::cardinality(name, "has-many")),
            None => Err(QueryError::not_loaded(name, &pascal_case(&self.model))),
        }
    }

    /// Record loaded for a belongs-to relation.
    pub fn related_one(&self, name: &str) -> QueryResult<Option<&Record>> {
        match self.relations.get(name) {
            Some(Loaded::One(record)) => Ok(record.as_deref()),
            Some(Loaded::Many(_)) => Err(QueryError::cardinality(name, "belongs-to")),
            None => Err(QueryError::not_loaded(name, &pascal_case(&self.model))),
        }
    }

    /// Whether a relation has been loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub(crate) fn attach(&mut self, name: impl Into<SmolStr>, loaded: Loaded) {
        self.relations.insert(name.into(), loaded);
    }

    pub(crate) fn mark_saved(&mut self) {
        self.persisted = true;
        self.dirty.clear();
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.persisted = false;
    }

    /// Take the changed columns and their values.
    pub(crate) fn changes(&self) -> Vec<(SmolStr, FilterValue)> {
        self.dirty
            .iter()
            .filter_map(|column| self.attrs.get(column).map(|v| (column.clone(), v.clone())))
            .collect()
    }
}

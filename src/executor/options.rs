//! Optional query parameters
//!
//! [`QueryOptions`] is the single bag of knobs the facade accepts. Each
//! operation reads the fields that make sense for it and ignores the rest:
//! `find`/`find_one` use hint, sort and projection; `update_many_detailed`
//! uses hint and upsert.

use mongodb::bson::{Bson, Document};
use mongodb::options::{FindOneOptions, FindOptions, Hint, UpdateOptions};

/// Index to force on a query
#[derive(Debug, Clone, PartialEq)]
pub enum IndexHint {
    /// Key pattern, e.g. `{ "email": 1 }`
    Keys(Document),

    /// Index name, e.g. `email_1`
    Name(String),
}

/// Sort direction for [`QueryOptions::sort_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Optional hint, sort, projection and upsert flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub hint: Option<IndexHint>,

    /// Ordered sort specification
    pub sort: Option<Document>,

    /// Field inclusion / exclusion
    pub projection: Option<Document>,

    pub upsert: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hint(mut self, keys: Document) -> Self {
        self.hint = Some(IndexHint::Keys(keys));
        self
    }

    pub fn hint_name(mut self, name: impl Into<String>) -> Self {
        self.hint = Some(IndexHint::Name(name.into()));
        self
    }

    /// Replace the sort specification
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Append one field to the sort specification, keeping earlier fields first
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        let order = match direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        self.sort
            .get_or_insert_with(Document::new)
            .insert(field.into(), Bson::Int32(order));
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub(crate) fn find_options(&self) -> FindOptions {
        let mut find_options = FindOptions::default();
        find_options.hint = self.driver_hint();
        find_options.sort = self.sort.clone();
        find_options.projection = self.projection.clone();
        find_options
    }

    pub(crate) fn find_one_options(&self) -> FindOneOptions {
        let mut find_options = FindOneOptions::default();
        find_options.hint = self.driver_hint();
        find_options.sort = self.sort.clone();
        find_options.projection = self.projection.clone();
        find_options
    }

    pub(crate) fn update_options(&self) -> UpdateOptions {
        let mut update_options = UpdateOptions::default();
        update_options.hint = self.driver_hint();
        if self.upsert {
            update_options.upsert = Some(true);
        }
        update_options
    }

    fn driver_hint(&self) -> Option<Hint> {
        self.hint.as_ref().map(|hint| match hint {
            IndexHint::Keys(keys) => Hint::Keys(keys.clone()),
            IndexHint::Name(name) => Hint::Name(name.clone()),
        })
    }
}

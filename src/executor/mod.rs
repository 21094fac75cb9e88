//! Data access layer
//!
//! This module exposes the operations application code calls once the
//! connector is ready:
//! - [`CollectionAccessor`]: resolves collections through the live connection
//! - [`QueryExecutor`]: find / insert / update / delete / aggregate / distinct
//! - [`QueryOptions`]: hint, sort, projection and upsert
//!
//! Results are collected eagerly; no cursor ever escapes this module.

pub mod accessor;
pub mod options;
pub mod query;

use std::fmt;

pub use accessor::{CollectionAccessor, CollectionHandle};
pub use options::{IndexHint, QueryOptions, SortDirection};
pub use query::{QueryExecutor, UpdateOutcome};

/// `database.collection`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

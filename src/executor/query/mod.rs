//! Query executor for CRUD operations
//!
//! Operations are split by kind:
//! - `read`: find, find_one, distinct
//! - `write`: insert_one, insert_many, update_many, delete_many
//! - `aggregate`: aggregation pipelines
//!
//! Each call resolves its collection again, so an executor created before
//! `connect()` starts working as soon as the connector is ready, and stops
//! with `NotConnected` once it is closed.

mod aggregate;
mod read;
mod write;

use std::sync::Arc;

use mongodb::bson::Bson;

use super::accessor::{CollectionAccessor, CollectionHandle};
use crate::connection::Connector;
use crate::error::Result;

/// Query executor for CRUD operations
#[derive(Clone)]
pub struct QueryExecutor {
    accessor: CollectionAccessor,
}

/// Full result of an update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter
    pub matched: u64,

    /// Documents actually changed
    pub modified: u64,

    /// `_id` of the inserted document when an upsert created one
    pub upserted_id: Option<Bson>,
}

impl QueryExecutor {
    pub fn new(connector: Arc<Connector>) -> Self {
        Self {
            accessor: CollectionAccessor::new(connector),
        }
    }

    pub fn accessor(&self) -> &CollectionAccessor {
        &self.accessor
    }

    async fn resolve(&self, database: &str, collection: &str) -> Result<CollectionHandle> {
        self.accessor.resolve(database, collection).await
    }
}

impl From<mongodb::results::UpdateResult> for UpdateOutcome {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        Self {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id,
        }
    }
}

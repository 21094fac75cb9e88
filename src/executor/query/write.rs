//! Write operations for query executor
//!
//! - insertOne, insertMany
//! - updateMany
//! - deleteMany

use std::collections::HashMap;

use mongodb::bson::{Bson, Document, doc};
use tracing::debug;

use super::UpdateOutcome;
use crate::error::Result;
use crate::executor::QueryOptions;

impl super::QueryExecutor {
    /// Insert one document and return its `_id`
    ///
    /// The driver assigns an ObjectId when the document has no `_id`.
    pub async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> Result<Bson> {
        let handle = self.resolve(database, collection).await?;
        debug!("Executing insertOne on '{}'", handle.namespace());

        let result = handle
            .collection()
            .insert_one(document)
            .await
            .map_err(|e| handle.fail("insertOne", e))?;

        Ok(result.inserted_id)
    }

    /// Insert documents in order and return their ids in input order
    ///
    /// An empty batch is not sent to the server and yields an empty vector,
    /// but still requires a ready connector.
    pub async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<Bson>> {
        let handle = self.resolve(database, collection).await?;
        if documents.is_empty() {
            debug!("insertMany on '{}' skipped: empty batch", handle.namespace());
            return Ok(Vec::new());
        }

        debug!(
            "Executing insertMany on '{}' with {} documents",
            handle.namespace(),
            documents.len()
        );

        let result = handle
            .collection()
            .insert_many(documents)
            .await
            .map_err(|e| handle.fail("insertMany", e))?;

        Ok(ordered_ids(result.inserted_ids))
    }

    /// `$set` the given fields on every matching document
    ///
    /// Returns the number of documents actually modified, so documents that
    /// already held the values are not counted.
    pub async fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64> {
        let outcome = self
            .update_many_detailed(database, collection, filter, set, &QueryOptions::default())
            .await?;
        Ok(outcome.modified)
    }

    /// `$set` with hint / upsert support and the full outcome
    pub async fn update_many_detailed(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        set: Document,
        options: &QueryOptions,
    ) -> Result<UpdateOutcome> {
        let handle = self.resolve(database, collection).await?;
        debug!(
            "Executing updateMany on '{}' with filter: {:?}",
            handle.namespace(),
            filter
        );

        let result = handle
            .collection()
            .update_many(filter, set_update(set))
            .with_options(options.update_options())
            .await
            .map_err(|e| handle.fail("updateMany", e))?;

        Ok(UpdateOutcome::from(result))
    }

    /// Delete every matching document and return how many were removed
    ///
    /// An empty filter deletes the whole collection.
    pub async fn delete_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> Result<u64> {
        let handle = self.resolve(database, collection).await?;
        debug!(
            "Executing deleteMany on '{}' with filter: {:?}",
            handle.namespace(),
            filter
        );

        let result = handle
            .collection()
            .delete_many(filter)
            .await
            .map_err(|e| handle.fail("deleteMany", e))?;

        Ok(result.deleted_count)
    }
}

/// Update document that assigns `fields` and leaves everything else alone
fn set_update(fields: Document) -> Document {
    doc! { "$set": fields }
}

/// Inserted ids keyed by batch position, in batch order
fn ordered_ids(inserted: HashMap<usize, Bson>) -> Vec<Bson> {
    let mut ids: Vec<(usize, Bson)> = inserted.into_iter().collect();
    ids.sort_by_key(|(index, _)| *index);
    ids.into_iter().map(|(_, id)| id).collect()
}

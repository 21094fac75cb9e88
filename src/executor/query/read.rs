//! Read operations for query executor
//!
//! - find, findOne
//! - distinct

use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, Document};
use tracing::debug;

use crate::error::Result;
use crate::executor::QueryOptions;

impl super::QueryExecutor {
    /// Return every document matching `filter`, fully collected
    ///
    /// An empty result is an empty vector, never an error.
    pub async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        options: &QueryOptions,
    ) -> Result<Vec<Document>> {
        let handle = self.resolve(database, collection).await?;
        debug!(
            "Executing find on '{}' with filter: {:?}",
            handle.namespace(),
            filter
        );

        let cursor = handle
            .collection()
            .find(filter)
            .with_options(options.find_options())
            .await
            .map_err(|e| handle.fail("find", e))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| handle.fail("find", e))?;

        debug!("find on '{}' returned {} documents", handle.namespace(), documents.len());
        Ok(documents)
    }

    /// Return the first matching document, if any
    ///
    /// "First" follows `options.sort` when one is given, natural order otherwise.
    pub async fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        options: &QueryOptions,
    ) -> Result<Option<Document>> {
        let handle = self.resolve(database, collection).await?;
        debug!(
            "Executing findOne on '{}' with filter: {:?}",
            handle.namespace(),
            filter
        );

        handle
            .collection()
            .find_one(filter)
            .with_options(options.find_one_options())
            .await
            .map_err(|e| handle.fail("findOne", e))
    }

    /// Distinct values of `field` across the whole collection
    pub async fn distinct(
        &self,
        database: &str,
        collection: &str,
        field: &str,
    ) -> Result<Vec<Bson>> {
        self.distinct_matching(database, collection, field, Document::new())
            .await
    }

    /// Distinct values of `field` among documents matching `filter`
    pub async fn distinct_matching(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        filter: Document,
    ) -> Result<Vec<Bson>> {
        let handle = self.resolve(database, collection).await?;
        debug!(
            "Executing distinct '{}' on '{}' with filter: {:?}",
            field,
            handle.namespace(),
            filter
        );

        handle
            .collection()
            .distinct(field, filter)
            .await
            .map_err(|e| handle.fail("distinct", e))
    }
}

//! Aggregation pipelines

use futures::stream::TryStreamExt;
use mongodb::bson::Document;
use tracing::debug;

use crate::error::Result;

impl super::QueryExecutor {
    /// Run a pipeline and collect every output document
    ///
    /// An empty pipeline returns the collection's documents.
    pub async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>> {
        let handle = self.resolve(database, collection).await?;
        debug!(
            "Executing aggregate on '{}' with {} pipeline stages",
            handle.namespace(),
            pipeline.len()
        );

        let cursor = handle
            .collection()
            .aggregate(pipeline)
            .await
            .map_err(|e| handle.fail("aggregate", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| handle.fail("aggregate", e))
    }
}

//! Collection resolution
//!
//! Every lookup goes through [`Connector::handle`], so a handle always comes
//! from the connection that is live at the time of the call.

use std::fmt;
use std::sync::Arc;

use mongodb::bson::Document;
use mongodb::{Collection, Database};

use super::Namespace;
use crate::connection::Connector;
use crate::error::{MongolinkError, OperationError, Result};

/// Resolves `(database, collection)` pairs through a ready connector
#[derive(Clone)]
pub struct CollectionAccessor {
    connector: Arc<Connector>,
}

/// A collection bound to the client that was live when it was resolved
#[derive(Clone)]
pub struct CollectionHandle {
    namespace: Namespace,
    collection: Collection<Document>,
}

impl CollectionAccessor {
    pub fn new(connector: Arc<Connector>) -> Self {
        Self { connector }
    }

    /// Resolve a collection
    ///
    /// # Errors
    /// `NotConnected` unless the connector is ready.
    pub async fn resolve(&self, database: &str, collection: &str) -> Result<CollectionHandle> {
        let client = self.connector.handle().await?;

        Ok(CollectionHandle {
            namespace: Namespace::new(database, collection),
            collection: client.database(database).collection(collection),
        })
    }

    /// Resolve a collection in the configured target database
    pub async fn resolve_default(&self, collection: &str) -> Result<CollectionHandle> {
        self.resolve(self.connector.database_name(), collection)
            .await
    }

    /// Raw database handle
    pub async fn database(&self, name: &str) -> Result<Database> {
        Ok(self.connector.handle().await?.database(name))
    }

    pub fn connector(&self) -> &Arc<Connector> {
        &self.connector
    }
}

impl CollectionHandle {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The driver collection
    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    /// Wrap a driver error with this handle's namespace
    pub(crate) fn fail(&self, operation: &'static str, source: mongodb::error::Error) -> MongolinkError {
        OperationError::new(operation, self.namespace.clone(), source).into()
    }
}

impl fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("namespace", &self.namespace)
            .finish()
    }
}

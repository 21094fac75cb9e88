//! Blocking interface
//!
//! Synchronous wrappers around [`crate::Connector`] and
//! [`crate::QueryExecutor`]. A [`Connector`] owns a dedicated multi-thread
//! tokio runtime; every call is `block_on` over the async implementation, so
//! both interfaces share one connection state machine and one set of
//! operations.
//!
//! Do not call into this module from inside an async runtime: `block_on`
//! panics when the current thread is already driving one.

use std::sync::Arc;

use mongodb::bson::{Bson, Document};
use tokio::runtime::{Builder, Runtime};

use crate::bootstrap::IndexBootstrap;
use crate::config::{Config, ConnectionConfig};
use crate::connection::ConnectionState;
use crate::error::Result;
use crate::executor::{QueryOptions, UpdateOutcome};

/// Blocking connection manager
#[derive(Clone)]
pub struct Connector {
    runtime: Arc<Runtime>,
    inner: Arc<crate::Connector>,
}

/// Blocking query executor
#[derive(Clone)]
pub struct QueryExecutor {
    runtime: Arc<Runtime>,
    inner: crate::QueryExecutor,
}

fn runtime() -> Result<Runtime> {
    Ok(Builder::new_multi_thread()
        .enable_all()
        .thread_name("mongolink-blocking")
        .build()?)
}

impl Connector {
    /// Build the runtime and the connector; no network activity
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Ok(Self {
            runtime: Arc::new(runtime()?),
            inner: Arc::new(crate::Connector::new(config)?),
        })
    }

    pub fn connect(&self) -> Result<()> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn close(&self) {
        self.runtime.block_on(self.inner.close())
    }

    pub fn state(&self) -> ConnectionState {
        self.runtime.block_on(self.inner.state())
    }

    pub fn is_connected(&self) -> bool {
        self.runtime.block_on(self.inner.is_connected())
    }

    pub fn database_name(&self) -> &str {
        self.inner.database_name()
    }

    pub fn masked_uri(&self) -> &str {
        self.inner.masked_uri()
    }

    /// Executor sharing this connector's runtime and connection
    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor {
            runtime: self.runtime.clone(),
            inner: crate::QueryExecutor::new(self.inner.clone()),
        }
    }

    /// The async connector underneath
    pub fn inner(&self) -> &Arc<crate::Connector> {
        &self.inner
    }
}

/// Blocking counterpart of [`crate::startup`]
pub fn startup(config: &Config, bootstrap: Option<&dyn IndexBootstrap>) -> Result<Connector> {
    let runtime = Arc::new(runtime()?);
    let inner = runtime.block_on(crate::startup(config, bootstrap))?;
    Ok(Connector { runtime, inner })
}

impl QueryExecutor {
    pub fn insert_one(&self, database: &str, collection: &str, document: Document) -> Result<Bson> {
        self.runtime
            .block_on(self.inner.insert_one(database, collection, document))
    }

    pub fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<Bson>> {
        self.runtime
            .block_on(self.inner.insert_many(database, collection, documents))
    }

    pub fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        options: &QueryOptions,
    ) -> Result<Vec<Document>> {
        self.runtime
            .block_on(self.inner.find(database, collection, filter, options))
    }

    pub fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        options: &QueryOptions,
    ) -> Result<Option<Document>> {
        self.runtime
            .block_on(self.inner.find_one(database, collection, filter, options))
    }

    pub fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64> {
        self.runtime
            .block_on(self.inner.update_many(database, collection, filter, set))
    }

    pub fn update_many_detailed(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        set: Document,
        options: &QueryOptions,
    ) -> Result<UpdateOutcome> {
        self.runtime.block_on(
            self.inner
                .update_many_detailed(database, collection, filter, set, options),
        )
    }

    pub fn delete_many(&self, database: &str, collection: &str, filter: Document) -> Result<u64> {
        self.runtime
            .block_on(self.inner.delete_many(database, collection, filter))
    }

    pub fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>> {
        self.runtime
            .block_on(self.inner.aggregate(database, collection, pipeline))
    }

    pub fn distinct(&self, database: &str, collection: &str, field: &str) -> Result<Vec<Bson>> {
        self.runtime
            .block_on(self.inner.distinct(database, collection, field))
    }

    pub fn distinct_matching(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        filter: Document,
    ) -> Result<Vec<Bson>> {
        self.runtime.block_on(
            self.inner
                .distinct_matching(database, collection, field, filter),
        )
    }
}

//! Process startup
//!
//! [`startup`] is what a hosting process calls before serving: it connects,
//! and in local run mode runs an index bootstrap once. A connection failure
//! aborts startup; a bootstrap failure is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::IndexModel;
use mongodb::bson::Document;
use mongodb::options::IndexOptions;
use tracing::{error, info};

use crate::config::{Config, IndexConfig, RunMode};
use crate::connection::{Connector, MongoTransport, Transport};
use crate::error::{OperationError, Result};
use crate::executor::Namespace;

/// Hook run once after a successful connect in local run mode
#[async_trait]
pub trait IndexBootstrap<T: Transport = MongoTransport>: Send + Sync {
    async fn bootstrap(&self, connector: &Connector<T>) -> Result<()>;
}

/// Index bootstrap driven by the `[[indexes]]` configuration entries
#[derive(Debug, Clone, Default)]
pub struct IndexPlan {
    indexes: Vec<IndexConfig>,
}

impl IndexPlan {
    pub fn new(indexes: Vec<IndexConfig>) -> Self {
        Self { indexes }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.indexes.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }
}

/// Ordered key pattern of an index entry
pub(crate) fn key_pattern(index: &IndexConfig) -> Result<Document> {
    index.validate()?;

    let mut keys = Document::new();
    for key in &index.keys {
        keys.insert(key.field.clone(), key.order);
    }
    Ok(keys)
}

fn index_model(index: &IndexConfig) -> Result<IndexModel> {
    let mut options = IndexOptions::default();
    options.name = index.name.clone();
    if index.unique {
        options.unique = Some(true);
    }

    Ok(IndexModel::builder()
        .keys(key_pattern(index)?)
        .options(options)
        .build())
}

#[async_trait]
impl IndexBootstrap for IndexPlan {
    async fn bootstrap(&self, connector: &Connector) -> Result<()> {
        let client = connector.handle().await?;

        for index in &self.indexes {
            let database = index
                .database
                .as_deref()
                .unwrap_or(connector.database_name());
            let model = index_model(index)?;

            let created = client
                .database(database)
                .collection::<Document>(&index.collection)
                .create_index(model)
                .await
                .map_err(|e| {
                    OperationError::new(
                        "createIndex",
                        Namespace::new(database, index.collection.as_str()),
                        e,
                    )
                })?;

            info!(
                "Index '{}' ready on {}.{}",
                created.index_name, database, index.collection
            );
        }

        Ok(())
    }
}

/// Connect with the driver transport and run the bootstrap in local mode
///
/// # Errors
/// Configuration or connection errors; the hosting process should stop.
pub async fn startup(
    config: &Config,
    bootstrap: Option<&dyn IndexBootstrap>,
) -> Result<Arc<Connector>> {
    let connector = Arc::new(Connector::new(config.connection.clone())?);
    start(connector, config.run_mode, bootstrap).await
}

/// [`startup`] for an already built connector
pub async fn start<T: Transport>(
    connector: Arc<Connector<T>>,
    run_mode: RunMode,
    bootstrap: Option<&dyn IndexBootstrap<T>>,
) -> Result<Arc<Connector<T>>> {
    connector.connect().await?;
    info!("Current running environment: {}", run_mode);

    if run_mode.is_local() {
        if let Some(bootstrap) = bootstrap {
            info!("Running index bootstrap");
            if let Err(e) = bootstrap.bootstrap(&connector).await {
                error!("Index bootstrap failed: {}", e);
            }
        }
    }

    Ok(connector)
}

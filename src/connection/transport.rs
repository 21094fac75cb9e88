//! Driver seam for the connector
//!
//! The [`Connector`](super::Connector) never talks to the driver directly. It
//! opens, probes and releases clients through a [`Transport`], which keeps the
//! startup protocol testable without a server.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, WriteConcern};
use mongodb::Client;
use tracing::debug;

use super::builder::ConnectionTarget;
use crate::error::{ConnectionError, Result};

/// Opens, probes and releases the live connection resource
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Shared handle to the live connection; cloning must be cheap
    type Handle: Clone + Send + Sync + 'static;

    /// Create the client. Must not wait for the server.
    async fn open(&self, target: &ConnectionTarget) -> Result<Self::Handle>;

    /// Administrative liveness probe
    async fn ping(&self, handle: &Self::Handle, target: &ConnectionTarget) -> Result<()>;

    /// Release every resource held by `handle`
    async fn release(&self, handle: Self::Handle);
}

/// Production transport backed by the official MongoDB driver
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoTransport;

impl MongoTransport {
    /// Translate a connection target into driver options
    pub async fn client_options(target: &ConnectionTarget) -> Result<ClientOptions> {
        let mut options = ClientOptions::parse(target.uri())
            .await
            .map_err(|e| ConnectionError::InvalidUri(e.to_string()))?;

        let params = target.params();

        if params.majority_write_concern {
            options.write_concern = Some(WriteConcern::majority());
        }
        options.retry_writes = Some(params.retry_writes);
        options.direct_connection = params.direct_connection;

        if let Some(name) = &params.replica_set {
            options.repl_set_name = Some(name.clone());
        }
        if let Some(heartbeat) = params.heartbeat_frequency {
            options.heartbeat_freq = Some(heartbeat);
        }
        if let Some(timeout) = params.connect_timeout {
            options.connect_timeout = Some(timeout);
        }
        if let Some(timeout) = params.server_selection_timeout {
            options.server_selection_timeout = Some(timeout);
        }
        if let Some(timeout) = params.socket_timeout {
            // The 3.x driver has no per-socket read timeout; operations are
            // bounded by server selection and connect timeouts instead.
            debug!("socket timeout of {:?} is not applied by the driver", timeout);
        }

        options.default_database = Some(target.database().to_string());
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        Ok(options)
    }
}

#[async_trait]
impl Transport for MongoTransport {
    type Handle = Client;

    async fn open(&self, target: &ConnectionTarget) -> Result<Client> {
        let options = Self::client_options(target).await?;
        Client::with_options(options).map_err(|e| ConnectionError::Driver(e).into())
    }

    async fn ping(&self, client: &Client, _target: &ConnectionTarget) -> Result<()> {
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::PingFailed(e).into())
    }

    async fn release(&self, client: Client) {
        client.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, ReadPreferenceMode};
    use crate::connection::build_target;
    use std::time::Duration;

    #[tokio::test]
    async fn test_standalone_options() {
        let config = ConnectionConfig {
            host: Some("localhost:27017".to_string()),
            topology: Some("standalone".to_string()),
            database: "orders".to_string(),
            timeouts: crate::config::Timeouts {
                socket_ms: None,
                connect_ms: Some(2_000),
                server_selection_ms: Some(1_000),
            },
            ..Default::default()
        };
        let target = build_target(&config).unwrap();
        let options = MongoTransport::client_options(&target).await.unwrap();

        assert_eq!(options.direct_connection, Some(true));
        assert_eq!(options.retry_writes, Some(true));
        assert!(options.repl_set_name.is_none());
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(2_000)));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_millis(1_000)));
        assert_eq!(options.default_database.as_deref(), Some("orders"));
        assert_eq!(options.write_concern, Some(WriteConcern::majority()));
    }

    #[tokio::test]
    async fn test_replica_set_options() {
        let config = ConnectionConfig {
            host: Some("db1:27017,db2:27017".to_string()),
            topology: Some("replica_set".to_string()),
            replica_set: Some("rs0".to_string()),
            heartbeat_ms: 2_500,
            read_preference: ReadPreferenceMode::SecondaryPreferred,
            ..Default::default()
        };
        let target = build_target(&config).unwrap();
        let options = MongoTransport::client_options(&target).await.unwrap();

        assert_eq!(options.repl_set_name.as_deref(), Some("rs0"));
        assert_eq!(options.heartbeat_freq, Some(Duration::from_millis(2_500)));
        assert!(options.direct_connection.is_none());
        assert_eq!(options.hosts.len(), 2);
        assert!(options.selection_criteria.is_some());
    }
}

//! MongoDB connection lifecycle and data access
//!
//! This library owns one MongoDB connection per process: it builds the
//! connection URI from configuration, verifies liveness at startup, and
//! exposes CRUD and aggregation operations that refuse to run unless the
//! connection is ready.
//!
//! # Modules
//!
//! - `blocking`: synchronous wrappers over the async interface
//! - `bootstrap`: startup protocol and index bootstrap
//! - `cli`: command-line interface and argument parsing
//! - `config`: configuration from TOML and environment variables
//! - `connection`: URI construction, connector state machine
//! - `error`: error types and driver error details
//! - `executor`: collection resolution and data operations
//!
//! # Example
//!
//! ```no_run
//! use mongolink::{Config, QueryExecutor, QueryOptions};
//! use mongodb::bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let connector = mongolink::startup(&config, None).await?;
//!
//!     let executor = QueryExecutor::new(connector.clone());
//!     executor.insert_one("panda", "users", doc! { "name": "ana" }).await?;
//!     let users = executor
//!         .find("panda", "users", doc! {}, &QueryOptions::default())
//!         .await?;
//!     println!("{} users", users.len());
//!
//!     connector.close().await;
//!     Ok(())
//! }
//! ```

pub mod blocking;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;

// Re-export commonly used types
pub use bootstrap::{IndexBootstrap, IndexPlan, startup};
pub use config::Config;
pub use connection::{ConnectionState, Connector};
pub use error::{MongolinkError, Result};
pub use executor::{CollectionAccessor, QueryExecutor, QueryOptions, UpdateOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

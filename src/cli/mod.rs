//! Command-line interface for mongolink
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading (file, environment, flags)
//! - Running one command against the configured deployment
//!
//! Every data command goes through the same startup protocol a service
//! would use, so `mongolink ping` is a quick way to check a deployment's
//! configuration.

pub mod input;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::bootstrap::{IndexBootstrap, IndexPlan, startup};
use crate::config::{Config, LogLevel, Secret};
use crate::connection::{Connector, build_target};
use crate::error::Result;
use crate::executor::{QueryExecutor, QueryOptions};

use input::{InsertBatch, parse_document, parse_document_array, parse_hint, parse_insert};
use output::JsonFormatter;

/// mongolink - MongoDB connection lifecycle and data access
#[derive(Parser, Debug)]
#[command(
    name = "mongolink",
    version,
    about = "Connect to MongoDB and run data operations",
    long_about = "Builds a MongoDB connection from configuration, verifies it with a ping,
and runs a single CRUD or aggregation command. Documents are read and printed
as MongoDB extended JSON."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Host list or connection URI
    ///
    /// Example: localhost:27017 or mongodb+srv://cluster0.example.net
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Target database name
    #[arg(short = 'd', long, value_name = "NAME")]
    pub database: Option<String>,

    /// Deployment topology (standalone, replicaset)
    #[arg(long, value_name = "TYPE")]
    pub topology: Option<String>,

    /// Username for authentication
    #[arg(short = 'u', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Password for authentication (prefer MONGO_PASSWORD)
    #[arg(short = 'p', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Print single-line JSON
    #[arg(long)]
    pub compact: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Optional read parameters
#[derive(Args, Debug, Default)]
pub struct ReadArgs {
    /// Sort specification, e.g. '{"created_at": -1}'
    #[arg(long, value_name = "JSON")]
    pub sort: Option<String>,

    /// Projection, e.g. '{"_id": 0, "email": 1}'
    #[arg(long, value_name = "JSON")]
    pub projection: Option<String>,

    /// Index key pattern as JSON, or an index name
    #[arg(long, value_name = "INDEX")]
    pub hint: Option<String>,
}

/// Subcommands for mongolink
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect and ping the deployment
    Ping,

    /// Print the connection URI with the password masked
    Uri,

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration
        #[arg(long)]
        validate: bool,
    },

    /// Find documents
    Find {
        collection: String,

        /// Filter as JSON
        #[arg(default_value = "{}")]
        filter: String,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Find the first matching document
    FindOne {
        collection: String,

        /// Filter as JSON
        #[arg(default_value = "{}")]
        filter: String,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Insert one document or an array of documents
    Insert {
        collection: String,

        /// Document or array of documents as JSON
        documents: String,
    },

    /// Set fields on every matching document
    Update {
        collection: String,

        /// Filter as JSON
        filter: String,

        /// Fields to set as JSON
        set: String,

        /// Insert a document when nothing matches
        #[arg(long)]
        upsert: bool,

        /// Index key pattern as JSON, or an index name
        #[arg(long, value_name = "INDEX")]
        hint: Option<String>,
    },

    /// Delete every matching document
    Delete {
        collection: String,

        /// Filter as JSON; '{}' deletes everything
        filter: String,
    },

    /// Run an aggregation pipeline
    Aggregate {
        collection: String,

        /// Pipeline as a JSON array of stages
        pipeline: String,
    },

    /// List distinct values of a field
    Distinct {
        collection: String,

        field: String,

        /// Filter as JSON
        #[arg(long, value_name = "JSON")]
        filter: Option<String>,
    },
}

/// CLI interface handler
pub struct CliInterface {
    args: CliArgs,

    /// Effective configuration: file, then environment, then flags
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        Ok(Self { args, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_logging_args(config, args);
        Self::apply_connection_args(config, args);
    }

    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        let conn = &mut config.connection;
        if let Some(host) = &args.host {
            conn.host = Some(host.clone());
        }
        if let Some(database) = &args.database {
            conn.database = database.clone();
        }
        if let Some(topology) = &args.topology {
            conn.topology = Some(topology.clone());
        }
        if let Some(username) = &args.username {
            conn.user = Some(username.clone());
        }
        if let Some(password) = &args.password {
            conn.password = Some(Secret::new(password.clone()));
        }
    }

    fn formatter(&self) -> JsonFormatter {
        JsonFormatter::new(!self.args.compact)
    }

    /// Run the selected command
    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Commands::Uri => {
                let target = build_target(&self.config.connection)?;
                println!("{}", target.masked_uri());
                Ok(())
            }
            Commands::Config { show, validate } => self.handle_config_command(*show, *validate),
            command => {
                let connector = self.connect().await?;
                let result = self.execute(&connector, command).await;
                connector.close().await;
                result
            }
        }
    }

    async fn connect(&self) -> Result<Arc<Connector>> {
        let plan = IndexPlan::from_config(&self.config);
        let bootstrap: Option<&dyn IndexBootstrap> = if plan.is_empty() {
            None
        } else {
            Some(&plan)
        };
        startup(&self.config, bootstrap).await
    }

    async fn execute(&self, connector: &Arc<Connector>, command: &Commands) -> Result<()> {
        let executor = QueryExecutor::new(connector.clone());
        let database = connector.database_name();
        let formatter = self.formatter();

        match command {
            Commands::Ping => {
                info!("Ping succeeded");
                println!("ok: {}", connector.masked_uri());
            }
            Commands::Find {
                collection,
                filter,
                read,
            } => {
                let filter = parse_document("filter", filter)?;
                let docs = executor
                    .find(database, collection, filter, &read_options(read)?)
                    .await?;
                println!("{}", formatter.format_documents(docs));
            }
            Commands::FindOne {
                collection,
                filter,
                read,
            } => {
                let filter = parse_document("filter", filter)?;
                match executor
                    .find_one(database, collection, filter, &read_options(read)?)
                    .await?
                {
                    Some(doc) => println!("{}", formatter.format_document(doc)),
                    None => println!("null"),
                }
            }
            Commands::Insert {
                collection,
                documents,
            } => match parse_insert(documents)? {
                InsertBatch::One(doc) => {
                    let id = executor.insert_one(database, collection, doc).await?;
                    println!("{}", formatter.format_value(id));
                }
                InsertBatch::Many(docs) => {
                    let ids = executor.insert_many(database, collection, docs).await?;
                    println!("{}", formatter.format_values(ids));
                }
            },
            Commands::Update {
                collection,
                filter,
                set,
                upsert,
                hint,
            } => {
                let filter = parse_document("filter", filter)?;
                let set = parse_document("set", set)?;
                let mut options = QueryOptions::new().upsert(*upsert);
                if let Some(hint) = hint {
                    options.hint = Some(parse_hint(hint)?);
                }

                let outcome = executor
                    .update_many_detailed(database, collection, filter, set, &options)
                    .await?;
                println!(
                    "matched: {}, modified: {}",
                    outcome.matched, outcome.modified
                );
                if let Some(id) = outcome.upserted_id {
                    println!("upserted: {}", formatter.format_value(id));
                }
            }
            Commands::Delete { collection, filter } => {
                let filter = parse_document("filter", filter)?;
                let deleted = executor.delete_many(database, collection, filter).await?;
                println!("deleted: {}", deleted);
            }
            Commands::Aggregate {
                collection,
                pipeline,
            } => {
                let pipeline = parse_document_array("pipeline", pipeline)?;
                let docs = executor.aggregate(database, collection, pipeline).await?;
                println!("{}", formatter.format_documents(docs));
            }
            Commands::Distinct {
                collection,
                field,
                filter,
            } => {
                let values = match filter {
                    Some(filter) => {
                        let filter = parse_document("filter", filter)?;
                        executor
                            .distinct_matching(database, collection, field, filter)
                            .await?
                    }
                    None => executor.distinct(database, collection, field).await?,
                };
                println!("{}", formatter.format_values(values));
            }
            Commands::Uri | Commands::Config { .. } => {}
        }

        Ok(())
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.config.validate()?;
            println!("Configuration is valid");
        }

        if show || !validate {
            println!("# Configuration file: {}", self.config_path().display());
            println!("{}", self.config.to_toml()?);
        }

        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }
}

fn read_options(args: &ReadArgs) -> Result<QueryOptions> {
    let mut options = QueryOptions::new();
    if let Some(sort) = &args.sort {
        options.sort = Some(parse_document("sort", sort)?);
    }
    if let Some(projection) = &args.projection {
        options.projection = Some(parse_document("projection", projection)?);
    }
    if let Some(hint) = &args.hint {
        options.hint = Some(parse_hint(hint)?);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::IndexHint;
    use mongodb::bson::doc;

    #[test]
    fn test_cli_args_ping() {
        let args = CliArgs::try_parse_from(["mongolink", "ping"]).unwrap();
        assert!(matches!(args.command, Commands::Ping));
        assert!(args.config_file.is_none());
    }

    #[test]
    fn test_cli_args_require_command() {
        assert!(CliArgs::try_parse_from(["mongolink"]).is_err());
    }

    #[test]
    fn test_find_defaults_to_empty_filter() {
        let args = CliArgs::try_parse_from(["mongolink", "find", "users"]).unwrap();
        match args.command {
            Commands::Find {
                collection,
                filter,
                read,
            } => {
                assert_eq!(collection, "users");
                assert_eq!(filter, "{}");
                assert!(read.sort.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_update_flags() {
        let args = CliArgs::try_parse_from([
            "mongolink",
            "--vv",
            "update",
            "users",
            r#"{"a": 1}"#,
            r#"{"b": 2}"#,
            "--upsert",
            "--hint",
            "a_1",
        ])
        .unwrap();

        assert!(args.very_verbose);
        match args.command {
            Commands::Update { upsert, hint, .. } => {
                assert!(upsert);
                assert_eq!(hint.as_deref(), Some("a_1"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::try_parse_from([
            "mongolink",
            "--host",
            "db.internal:27017",
            "--database",
            "panda",
            "--topology",
            "standalone",
            "-u",
            "svc",
            "-p",
            "hunter2",
            "-v",
            "uri",
        ])
        .unwrap();

        let mut config = Config::default();
        CliInterface::apply_args_to_config(&mut config, &args);

        assert_eq!(config.connection.host.as_deref(), Some("db.internal:27017"));
        assert_eq!(config.connection.database, "panda");
        assert_eq!(config.connection.user.as_deref(), Some("svc"));
        assert_eq!(
            config.connection.password.as_ref().map(|p| p.expose()),
            Some("hunter2")
        );
        assert_eq!(config.logging.level, LogLevel::Debug);

        let target = build_target(&config.connection).unwrap();
        assert!(!target.masked_uri().contains("hunter2"));
    }

    #[test]
    fn test_read_options() {
        let args = ReadArgs {
            sort: Some(r#"{"created_at": -1}"#.to_string()),
            projection: Some(r#"{"_id": 0}"#.to_string()),
            hint: Some(r#"{"created_at": 1}"#.to_string()),
        };

        let options = read_options(&args).unwrap();
        assert_eq!(options.sort, Some(doc! { "created_at": -1 }));
        assert_eq!(options.projection, Some(doc! { "_id": 0 }));
        assert_eq!(
            options.hint,
            Some(IndexHint::Keys(doc! { "created_at": 1 }))
        );

        let bad = ReadArgs {
            sort: Some("created_at".to_string()),
            ..Default::default()
        };
        assert!(read_options(&bad).is_err());
    }
}

//! Configuration management for mongolink
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables (`MONGO_*`, `RUN_MODE`, `MONGOLINK_LOG_LEVEL`)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values
//!
//! Nothing here validates that the connection can actually be built; that is
//! the job of [`crate::connection::build_target`], which [`Config::validate`]
//! calls.

mod secret;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub use secret::{MASK, Secret};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Deployment flavour; `local` enables index bootstrapping at startup
    #[serde(default)]
    pub run_mode: RunMode,

    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Indexes created by the startup bootstrap in local mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexConfig>,
}

/// How to reach the database.
///
/// `host` and `topology` stay raw strings because they usually come straight
/// from the environment; the connection builder rejects bad values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Host list, e.g. `localhost:27017` or `a:27017,b:27017`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Username for authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Password for authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,

    /// Authentication database; defaults to `database`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_db: Option<String>,

    /// Target database
    #[serde(default = "default_database")]
    pub database: String,

    /// `standalone` or `replica_set`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,

    /// Replica set name, required for `replica_set`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_set: Option<String>,

    /// Heartbeat interval used for replica sets, in milliseconds
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// Read preference
    #[serde(default)]
    pub read_preference: ReadPreferenceMode,

    /// Driver timeouts
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Driver timeouts in milliseconds. Absent values keep the driver default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_selection_ms: Option<u64>,
}

/// Deployment shape of the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Single node, connected directly without topology discovery
    Standalone,

    /// Replica set, discovered and monitored through heartbeats
    ReplicaSet,
}

/// Read preference modes understood by the driver
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadPreferenceMode {
    #[default]
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

/// Run mode of the hosting process
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Local / development: index bootstrap runs at startup
    Local,

    /// Anything else
    #[default]
    Cloud,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// One index created by the startup bootstrap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexConfig {
    /// Database; defaults to the connection's target database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    pub collection: String,

    /// Ordered key list
    pub keys: Vec<IndexKey>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub unique: bool,
}

/// A single field of an index key pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexKey {
    pub field: String,

    /// `1` ascending, `-1` descending
    #[serde(default = "default_index_order")]
    pub order: i32,
}

// Default value functions
fn default_database() -> String {
    "test".to_string()
}

fn default_heartbeat_ms() -> u64 {
    10_000
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

fn default_index_order() -> i32 {
    1
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            password: None,
            auth_db: None,
            database: default_database(),
            topology: None,
            replica_set: None,
            heartbeat_ms: default_heartbeat_ms(),
            read_preference: ReadPreferenceMode::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration from the process environment only
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Load configuration from all sources with precedence
    ///
    /// An explicit `path` must exist. Without one, the default path is read
    /// if present. Environment variables are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields with variables found through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let conn = &mut self.connection;

        if let Some(host) = get("MONGO_URI").or_else(|| get("MONGO_HOST")) {
            conn.host = Some(host);
        }
        if let Some(user) = get("MONGO_USER") {
            conn.user = Some(user);
        }
        if let Some(password) = get("MONGO_PASSWORD") {
            conn.password = Some(Secret::new(password));
        }
        if let Some(auth_db) = get("MONGO_AUTH_DB") {
            conn.auth_db = Some(auth_db);
        }
        if let Some(database) = get("MONGO_DB") {
            conn.database = database;
        }
        if let Some(topology) = get("MONGO_TYPE") {
            conn.topology = Some(topology);
        }
        if let Some(replica_set) = get("MONGO_REPLICA_SET") {
            conn.replica_set = Some(replica_set);
        }
        if let Some(value) = get("MONGO_SOCKET_TIMEOUT_MS") {
            conn.timeouts.socket_ms = Some(parse_number("MONGO_SOCKET_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = get("MONGO_CONNECT_TIMEOUT_MS") {
            conn.timeouts.connect_ms = Some(parse_number("MONGO_CONNECT_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = get("MONGO_SERVER_SELECTION_TIMEOUT_MS") {
            conn.timeouts.server_selection_ms =
                Some(parse_number("MONGO_SERVER_SELECTION_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = get("MONGO_HEARTBEAT_MS") {
            conn.heartbeat_ms = parse_number("MONGO_HEARTBEAT_MS", &value)?;
        }
        if let Some(value) = get("MONGO_READ_PREFERENCE") {
            conn.read_preference = value.parse()?;
        }
        if let Some(value) = get("RUN_MODE") {
            self.run_mode = value.parse()?;
        }
        if let Some(value) = get("MONGOLINK_LOG_LEVEL") {
            self.logging.level = value.parse()?;
        }

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mongolink")
            .join("config.toml")
    }

    /// Render the configuration as TOML. Secrets are masked.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// Builds the connection target (without connecting) and checks every
    /// index definition.
    pub fn validate(&self) -> Result<()> {
        crate::connection::build_target(&self.connection)?;

        for index in &self.indexes {
            index.validate()?;
        }

        Ok(())
    }
}

impl Timeouts {
    pub fn socket(&self) -> Option<Duration> {
        self.socket_ms.map(Duration::from_millis)
    }

    pub fn connect(&self) -> Option<Duration> {
        self.connect_ms.map(Duration::from_millis)
    }

    pub fn server_selection(&self) -> Option<Duration> {
        self.server_selection_ms.map(Duration::from_millis)
    }
}

impl IndexConfig {
    /// Checks shared by config loading and index creation
    pub(crate) fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::MissingField("indexes.collection".to_string()).into());
        }
        if self.keys.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "indexes.keys ({})",
                self.collection
            ))
            .into());
        }
        if let Some(key) = self.keys.iter().find(|k| k.order != 1 && k.order != -1) {
            return Err(ConfigError::InvalidValue {
                field: format!("indexes.keys.{}.order", key.field),
                value: key.order.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl ReadPreferenceMode {
    /// Value of the `readPreference` URI option
    pub fn as_uri_value(&self) -> &'static str {
        match self {
            ReadPreferenceMode::Primary => "primary",
            ReadPreferenceMode::PrimaryPreferred => "primaryPreferred",
            ReadPreferenceMode::Secondary => "secondary",
            ReadPreferenceMode::SecondaryPreferred => "secondaryPreferred",
            ReadPreferenceMode::Nearest => "nearest",
        }
    }
}

impl RunMode {
    pub fn is_local(&self) -> bool {
        matches!(self, RunMode::Local)
    }
}

impl FromStr for Topology {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standalone" => Ok(Topology::Standalone),
            "replica_set" | "replicaset" => Ok(Topology::ReplicaSet),
            _ => Err(ConfigError::InvalidValue {
                field: "topology".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Standalone => f.write_str("standalone"),
            Topology::ReplicaSet => f.write_str("replica_set"),
        }
    }
}

impl FromStr for ReadPreferenceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "primary" => Ok(ReadPreferenceMode::Primary),
            "primarypreferred" => Ok(ReadPreferenceMode::PrimaryPreferred),
            "secondary" => Ok(ReadPreferenceMode::Secondary),
            "secondarypreferred" => Ok(ReadPreferenceMode::SecondaryPreferred),
            "nearest" => Ok(ReadPreferenceMode::Nearest),
            _ => Err(ConfigError::InvalidValue {
                field: "read_preference".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("local") {
            Ok(RunMode::Local)
        } else {
            Ok(RunMode::Cloud)
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Local => f.write_str("local"),
            RunMode::Cloud => f.write_str("cloud"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

fn parse_number(field: &str, value: &str) -> std::result::Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

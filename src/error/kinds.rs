use std::{fmt, io, time::Duration};

use crate::connection::ConnectionState;
use crate::error::mongo::{ErrorInfo, extract_error_info};
use crate::executor::Namespace;

/// Crate-wide `Result` type using [`MongolinkError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, MongolinkError>;

/// Top-level error type for mongolink.
///
/// Every fallible call in the crate surfaces one of these kinds to its
/// immediate caller. Nothing is retried and nothing is swallowed, with the
/// single exception of index bootstrap failures during startup.
#[derive(Debug)]
pub enum MongolinkError {
    /// Malformed or incomplete connection configuration.
    Config(ConfigError),

    /// Failure while opening or probing the connection.
    Connection(ConnectionError),

    /// An accessor or operation ran while the connector was not ready.
    NotConnected { state: ConnectionState },

    /// A CRUD or aggregation call failed after a successful connection.
    Operation(OperationError),

    /// Malformed documents or arguments supplied by the caller.
    InvalidInput(String),

    /// I/O errors (config files, runtime creation).
    Io(io::Error),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// The built URI was rejected by the driver.
    InvalidUri(String),

    /// The driver failed while creating the client.
    Driver(mongodb::error::Error),

    /// The liveness probe reached the server and failed.
    PingFailed(mongodb::error::Error),

    /// The liveness probe did not answer in time.
    Timeout(Duration),

    /// `connect()` was called on a connector that already failed or closed.
    Terminal(ConnectionState),

    /// The transport reported a failure that carries no driver error.
    Other(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Failure of a single data-access call.
#[derive(Debug)]
pub struct OperationError {
    /// Operation name as the server knows it, e.g. `insertOne`.
    pub operation: &'static str,

    /// Target `database.collection`.
    pub namespace: Namespace,

    /// Underlying driver error.
    pub source: mongodb::error::Error,
}

impl OperationError {
    pub fn new(
        operation: &'static str,
        namespace: Namespace,
        source: mongodb::error::Error,
    ) -> Self {
        Self {
            operation,
            namespace,
            source,
        }
    }

    /// Structured view of the driver error (code, code name, message).
    pub fn info(&self) -> ErrorInfo {
        extract_error_info(&self.source)
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for MongolinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MongolinkError::Config(e) => write!(f, "Configuration error: {e}"),
            MongolinkError::Connection(e) => write!(f, "Connection error: {e}"),
            MongolinkError::NotConnected { state } => {
                write!(f, "Not connected to MongoDB (connector is {state})")
            }
            MongolinkError::Operation(e) => write!(f, "Operation error: {e}"),
            MongolinkError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            MongolinkError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidUri(msg) => write!(f, "Invalid connection URI: {msg}"),
            ConnectionError::Driver(e) => write!(f, "Failed to connect: {e}"),
            ConnectionError::PingFailed(e) => write!(f, "Ping failed: {e}"),
            ConnectionError::Timeout(limit) => {
                write!(f, "Ping did not complete within {} ms", limit.as_millis())
            }
            ConnectionError::Terminal(state) => {
                write!(f, "Connector is {state} and cannot connect again")
            }
            ConnectionError::Other(msg) => write!(f, "Failed to connect: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.info();
        write!(f, "{} on {} failed", self.operation, self.namespace)?;
        match (info.name.as_deref(), info.code) {
            (Some(name), Some(code)) => write!(f, " [{name} ({code})]")?,
            (None, Some(code)) => write!(f, " [code {code}]")?,
            _ => {}
        }
        match info.message {
            Some(message) => write!(f, ": {message}"),
            None => write!(f, ": {}", self.source),
        }
    }
}

impl std::error::Error for MongolinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MongolinkError::Config(e) => Some(e),
            MongolinkError::Connection(e) => Some(e),
            MongolinkError::Operation(e) => Some(e),
            MongolinkError::Io(e) => Some(e),
            MongolinkError::NotConnected { .. } | MongolinkError::InvalidInput(_) => None,
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Driver(e) | ConnectionError::PingFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/* ========================= Conversions to MongolinkError ========================= */

impl From<io::Error> for MongolinkError {
    fn from(err: io::Error) -> Self {
        MongolinkError::Io(err)
    }
}

impl From<ConnectionError> for MongolinkError {
    fn from(err: ConnectionError) -> Self {
        MongolinkError::Connection(err)
    }
}

impl From<ConfigError> for MongolinkError {
    fn from(err: ConfigError) -> Self {
        MongolinkError::Config(err)
    }
}

impl From<OperationError> for MongolinkError {
    fn from(err: OperationError) -> Self {
        MongolinkError::Operation(err)
    }
}

impl MongolinkError {
    /// True for [`MongolinkError::NotConnected`].
    pub fn is_not_connected(&self) -> bool {
        matches!(self, MongolinkError::NotConnected { .. })
    }
}

//! Error handling for mongolink.
//!
//! Four kinds reach callers:
//! - [`ConfigError`]: the connection configuration is incomplete or malformed
//! - [`ConnectionError`]: the connect / ping sequence failed
//! - `NotConnected`: the connector was not ready when an operation ran
//! - [`OperationError`]: a CRUD or aggregation call failed on the server
//!
//! Driver errors inside an [`OperationError`] can be inspected through
//! [`ErrorInfo`], which is serializable to JSON.

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{ConfigError, ConnectionError, MongolinkError, OperationError, Result};
pub use mongo::{ErrorDetails, ErrorInfo};

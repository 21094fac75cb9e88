//! Connection management for MongoDB
//!
//! This module owns the single live connection of the process:
//! - Target construction from configuration ([`build_target`])
//! - The startup protocol: open, ping, commit or roll back
//! - Lifecycle state and teardown
//!
//! A [`Connector`] is created explicitly and shared by `Arc`; there is no
//! global instance.

pub mod builder;
pub mod transport;

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, MongolinkError, Result};

pub use builder::{ClientParams, ConnectionTarget, build_target};
pub use transport::{MongoTransport, Transport};

/// Probe timeout used when no server selection timeout is configured
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// `connect()` has not been called
    Uninitialized,

    /// Currently connecting
    Connecting,

    /// Connected and ready
    Ready,

    /// Connection failed; terminal
    Failed(String),

    /// Closed after being ready; terminal
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Uninitialized => f.write_str("uninitialized"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Ready => f.write_str("ready"),
            ConnectionState::Failed(reason) => write!(f, "failed ({reason})"),
            ConnectionState::Closed => f.write_str("closed"),
        }
    }
}

/// State plus the handle it guards
enum Slot<H> {
    Uninitialized,
    Connecting,
    Ready(H),
    Failed(String),
    Closed,
}

impl<H> Slot<H> {
    fn state(&self) -> ConnectionState {
        match self {
            Slot::Uninitialized => ConnectionState::Uninitialized,
            Slot::Connecting => ConnectionState::Connecting,
            Slot::Ready(_) => ConnectionState::Ready,
            Slot::Failed(reason) => ConnectionState::Failed(reason.clone()),
            Slot::Closed => ConnectionState::Closed,
        }
    }
}

// The slot lock is never held across an await, so a blocking lock is
// enough and drop code can always take it.
fn read_slot<H>(slot: &RwLock<Slot<H>>) -> RwLockReadGuard<'_, Slot<H>> {
    slot.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_slot<H>(slot: &RwLock<Slot<H>>) -> RwLockWriteGuard<'_, Slot<H>> {
    slot.write().unwrap_or_else(PoisonError::into_inner)
}

/// MongoDB connection manager
///
/// Holds at most one live client. State moves
/// `Uninitialized -> Connecting -> Ready -> Closed` or
/// `Connecting -> Failed`; `Failed` and `Closed` are final, so a new
/// `Connector` is needed to try again.
pub struct Connector<T: Transport = MongoTransport> {
    transport: T,

    /// Connection configuration, never mutated
    config: ConnectionConfig,

    /// Built once at construction
    target: ConnectionTarget,

    slot: RwLock<Slot<T::Handle>>,

    /// Serializes connect and close
    lifecycle: Mutex<()>,
}

impl Connector<MongoTransport> {
    /// Create a connector backed by the MongoDB driver
    ///
    /// # Errors
    /// [`crate::error::ConfigError`] if the configuration cannot produce a
    /// connection target. No network activity happens here.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_transport(config, MongoTransport)
    }
}

impl<T: Transport> Connector<T> {
    /// Create a connector using a custom transport
    pub fn with_transport(config: ConnectionConfig, transport: T) -> Result<Self> {
        let target = build_target(&config)?;

        Ok(Self {
            transport,
            config,
            target,
            slot: RwLock::new(Slot::Uninitialized),
            lifecycle: Mutex::new(()),
        })
    }

    /// Establish connection to MongoDB
    ///
    /// Idempotent once ready. Concurrent callers wait for the attempt in
    /// flight and share its outcome; only one client is ever created.
    ///
    /// # Errors
    /// [`ConnectionError`] when the client cannot be created, the ping fails
    /// or times out, or the connector already failed or closed.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        {
            let mut slot = write_slot(&self.slot);
            match slot.state() {
                ConnectionState::Ready => {
                    debug!("connect() called on a ready connector, nothing to do");
                    return Ok(());
                }
                ConnectionState::Uninitialized => *slot = Slot::Connecting,
                other => return Err(ConnectionError::Terminal(other).into()),
            }
        }

        let mut attempt = PendingConnect {
            slot: &self.slot,
            settled: false,
        };

        info!("Attempting to connect to MongoDB: {}", self.target.masked_uri());

        match self.establish().await {
            Ok(handle) => {
                *write_slot(&self.slot) = Slot::Ready(handle);
                attempt.settled = true;
                info!(
                    "Successfully connected to MongoDB, database: '{}'",
                    self.target.database()
                );
                Ok(())
            }
            Err(e) => {
                *write_slot(&self.slot) = Slot::Failed(e.to_string());
                attempt.settled = true;
                error!("FATAL: MongoDB connection failed. Reason: {}", e);
                Err(e)
            }
        }
    }

    /// Open the client and probe it, releasing it on any failure
    async fn establish(&self) -> Result<T::Handle> {
        let handle = self.transport.open(&self.target).await?;

        let limit = self.probe_timeout();
        let failure: MongolinkError =
            match tokio::time::timeout(limit, self.transport.ping(&handle, &self.target)).await {
                Ok(Ok(())) => return Ok(handle),
                Ok(Err(e)) => e,
                Err(_) => ConnectionError::Timeout(limit).into(),
            };

        self.transport.release(handle).await;
        Err(failure)
    }

    /// Disconnect from MongoDB
    ///
    /// Releases the client when ready. Calling it in any other state does
    /// nothing.
    pub async fn close(&self) {
        let _guard = self.lifecycle.lock().await;

        let handle = {
            let mut slot = write_slot(&self.slot);
            if !matches!(*slot, Slot::Ready(_)) {
                debug!("close() ignored, connector is {}", slot.state());
                return;
            }
            match std::mem::replace(&mut *slot, Slot::Closed) {
                Slot::Ready(handle) => handle,
                _ => return,
            }
        };

        self.transport.release(handle).await;
        info!("MongoDB connection closed.");
    }

    /// Get the live connection handle
    ///
    /// # Errors
    /// `NotConnected` unless the connector is ready.
    pub async fn handle(&self) -> Result<T::Handle> {
        match &*read_slot(&self.slot) {
            Slot::Ready(handle) => Ok(handle.clone()),
            other => Err(MongolinkError::NotConnected {
                state: other.state(),
            }),
        }
    }

    /// Get current connection state
    pub async fn state(&self) -> ConnectionState {
        read_slot(&self.slot).state()
    }

    /// Check if currently connected
    pub async fn is_connected(&self) -> bool {
        matches!(*read_slot(&self.slot), Slot::Ready(_))
    }

    /// Target database from the configuration
    pub fn database_name(&self) -> &str {
        self.target.database()
    }

    /// Connection URI with the password masked
    pub fn masked_uri(&self) -> &str {
        self.target.masked_uri()
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn probe_timeout(&self) -> Duration {
        self.target
            .params()
            .server_selection_timeout
            .unwrap_or(DEFAULT_PROBE_TIMEOUT)
    }
}

impl<T: Transport> fmt::Debug for Connector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Connector");
        debug
            .field("uri", &self.target.masked_uri())
            .field("database", &self.target.database());
        match self.slot.try_read() {
            Ok(slot) => debug.field("state", &slot.state()),
            Err(_) => debug.field("state", &format_args!("<busy>")),
        };
        debug.finish_non_exhaustive()
    }
}

/// Marks the connector failed if a connect attempt is dropped mid-flight
struct PendingConnect<'a, H> {
    slot: &'a RwLock<Slot<H>>,
    settled: bool,
}

impl<H> Drop for PendingConnect<'_, H> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        *write_slot(self.slot) = Slot::Failed("connect attempt was cancelled".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy, PartialEq)]
    enum Reply {
        Answer,
        Refuse,
        Hang,
    }

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        pinged: AtomicUsize,
        released: AtomicUsize,
    }

    struct MockTransport {
        counters: Arc<Counters>,
        reply: Reply,
        open_delay: Duration,
    }

    impl MockTransport {
        fn new(reply: Reply) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let transport = Self {
                counters: counters.clone(),
                reply,
                open_delay: Duration::ZERO,
            };
            (transport, counters)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        type Handle = usize;

        async fn open(&self, _target: &ConnectionTarget) -> Result<usize> {
            if !self.open_delay.is_zero() {
                tokio::time::sleep(self.open_delay).await;
            }
            Ok(self.counters.opened.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn ping(&self, _handle: &usize, _target: &ConnectionTarget) -> Result<()> {
            self.counters.pinged.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Answer => Ok(()),
                Reply::Refuse => Err(ConnectionError::Other("connection refused".into()).into()),
                Reply::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }

        async fn release(&self, _handle: usize) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            host: Some("localhost:27017".to_string()),
            topology: Some("standalone".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let (transport, counters) = MockTransport::new(Reply::Answer);
        let connector = Connector::with_transport(config(), transport).unwrap();

        assert_eq!(connector.state().await, ConnectionState::Uninitialized);
        connector.connect().await.unwrap();
        connector.connect().await.unwrap();

        assert_eq!(connector.state().await, ConnectionState::Ready);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.pinged.load(Ordering::SeqCst), 1);
        assert_eq!(connector.handle().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_connect_creates_one_client() {
        let (mut transport, counters) = MockTransport::new(Reply::Answer);
        transport.open_delay = Duration::from_millis(20);
        let connector = Arc::new(Connector::with_transport(config(), transport).unwrap());

        let (a, b) = tokio::join!(connector.connect(), connector.connect());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert!(connector.is_connected().await);
    }

    #[tokio::test]
    async fn test_ping_failure_releases_and_fails() {
        let (transport, counters) = MockTransport::new(Reply::Refuse);
        let connector = Connector::with_transport(config(), transport).unwrap();

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, MongolinkError::Connection(_)));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert!(matches!(connector.state().await, ConnectionState::Failed(_)));

        let err = connector.handle().await.unwrap_err();
        assert!(err.is_not_connected());

        // failed is terminal
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(
            err,
            MongolinkError::Connection(ConnectionError::Terminal(ConnectionState::Failed(_)))
        ));
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ping_timeout_uses_server_selection_timeout() {
        let (transport, counters) = MockTransport::new(Reply::Hang);
        let mut config = config();
        config.timeouts.server_selection_ms = Some(30);
        let connector = Connector::with_transport(config, transport).unwrap();

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(
            err,
            MongolinkError::Connection(ConnectionError::Timeout(limit)) if limit == Duration::from_millis(30)
        ));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_lifecycle() {
        let (transport, counters) = MockTransport::new(Reply::Answer);
        let connector = Connector::with_transport(config(), transport).unwrap();

        // close before connect is a no-op
        connector.close().await;
        assert_eq!(connector.state().await, ConnectionState::Uninitialized);

        connector.connect().await.unwrap();
        connector.close().await;
        connector.close().await;

        assert_eq!(connector.state().await, ConnectionState::Closed);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert!(connector.handle().await.unwrap_err().is_not_connected());

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(
            err,
            MongolinkError::Connection(ConnectionError::Terminal(ConnectionState::Closed))
        ));
    }

    #[tokio::test]
    async fn test_handle_while_connecting() {
        let (mut transport, _counters) = MockTransport::new(Reply::Answer);
        transport.open_delay = Duration::from_millis(50);
        let connector = Connector::with_transport(config(), transport).unwrap();

        let observe = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            connector.handle().await
        };
        let (connected, during) = tokio::join!(connector.connect(), observe);

        assert!(connected.is_ok());
        assert!(matches!(
            during,
            Err(MongolinkError::NotConnected {
                state: ConnectionState::Connecting
            })
        ));
        assert_eq!(connector.handle().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_connect_marks_failed() {
        let (transport, _counters) = MockTransport::new(Reply::Hang);
        let connector = Connector::with_transport(config(), transport).unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(20), connector.connect()).await;
        assert!(outcome.is_err());
        assert!(matches!(connector.state().await, ConnectionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_cancelled_connect_waits_for_readers() {
        let (transport, _counters) = MockTransport::new(Reply::Hang);
        let connector = Arc::new(Connector::with_transport(config(), transport).unwrap());

        let mut connect = Box::pin(connector.connect());
        let outcome = tokio::time::timeout(Duration::from_millis(20), &mut connect).await;
        assert!(outcome.is_err());
        assert_eq!(connector.state().await, ConnectionState::Connecting);

        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let reader = {
            let connector = connector.clone();
            std::thread::spawn(move || {
                let slot = connector.slot.read().unwrap();
                held_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(50));
                drop(slot);
            })
        };
        held_rx.recv().unwrap();

        // blocks until the reader lets go instead of skipping the update
        drop(connect);
        reader.join().unwrap();

        assert!(matches!(connector.state().await, ConnectionState::Failed(_)));
        assert!(connector.handle().await.unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_debug_masks_password() {
        let (transport, _counters) = MockTransport::new(Reply::Answer);
        let mut config = config();
        config.user = Some("app".to_string());
        config.password = Some(crate::config::Secret::new("hunter2"));
        let connector = Connector::with_transport(config, transport).unwrap();

        let debug = format!("{connector:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("****"));
        assert!(debug.contains("Uninitialized"));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_connecting() {
        let (transport, counters) = MockTransport::new(Reply::Answer);
        let mut config = config();
        config.topology = Some("cluster".to_string());

        let result = Connector::with_transport(config, transport);
        assert!(matches!(result, Err(MongolinkError::Config(_))));
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Ready.to_string(), "ready");
        assert_eq!(
            ConnectionState::Failed("boom".to_string()).to_string(),
            "failed (boom)"
        );
    }
}

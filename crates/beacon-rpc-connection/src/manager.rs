//! Keeps one live connection pointed at the currently resolved address.

use crate::config::ConnectionConfig;
use crate::connector::{Connection, Connector, StubFactory};
use crate::events::ConnectionEvent;
use crate::keepalive;
use crate::state::{ConnectionState, StateTracker};
use beacon_rpc_core::{BoxError, Checkout, ConnectionHealth, StubProvider, TransportError};
use beacon_rpc_discovery::{AddressResolver, Registry, Role};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Error used as the source of `ConnectFailed` when a dial exceeds its bound.
#[derive(Debug, Clone, thiserror::Error)]
#[error("dial timed out after {0:?}")]
pub struct DialTimeout(pub Duration);

struct Live<C, S> {
    address: String,
    connection: Arc<C>,
    stub: S,
    health: ConnectionHealth,
    keep_alive: Option<JoinHandle<()>>,
}

impl<C, S: Clone> Live<C, S> {
    fn is_usable_for(&self, address: &str) -> bool {
        self.address == address && !self.health.is_broken()
    }

    fn checkout(&self) -> Checkout<S> {
        Checkout::new(self.stub.clone(), self.address.clone(), self.health.clone())
    }
}

// The last address outlives a failed rebuild so the next success still
// reports a replacement rather than a first connect.
struct Slot<C, S> {
    live: Option<Live<C, S>>,
    last_address: Option<String>,
}

impl<C, S> Default for Slot<C, S> {
    fn default() -> Self {
        Self {
            live: None,
            last_address: None,
        }
    }
}

impl<C, S> Drop for Live<C, S> {
    fn drop(&mut self) {
        if let Some(task) = self.keep_alive.take() {
            task.abort();
        }
    }
}

/// Owns the connection and stub for one role.
///
/// Every [`ensure_connected`](Self::ensure_connected) re-resolves the role.
/// The existing connection is reused while the address is unchanged and
/// nobody marked it broken; otherwise it is closed and a new one dialed.
/// Concurrent callers that find the connection stale serialize on a write
/// lock, and only the first of them dials.
pub struct ConnectionManager<R, C, F>
where
    C: Connector,
    F: StubFactory<C::Connection>,
{
    resolver: AddressResolver<R>,
    connector: C,
    stub_factory: F,
    config: Arc<ConnectionConfig>,
    slot: RwLock<Slot<C::Connection, F::Stub>>,
    closed: AtomicBool,
    state: StateTracker,
}

impl<R, C, F> ConnectionManager<R, C, F>
where
    R: Registry,
    C: Connector,
    F: StubFactory<C::Connection>,
{
    /// Creates a manager. Nothing is dialed until the first checkout.
    pub fn new(resolver: AddressResolver<R>, connector: C, stub_factory: F, config: ConnectionConfig) -> Self {
        Self {
            resolver,
            connector,
            stub_factory,
            config: Arc::new(config),
            slot: RwLock::new(Slot::default()),
            closed: AtomicBool::new(false),
            state: StateTracker::default(),
        }
    }

    /// The role this manager connects to.
    pub fn role(&self) -> &Role {
        self.resolver.role()
    }

    /// The connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state.state()
    }

    /// Number of connections built so far.
    pub fn connects(&self) -> u64 {
        self.state.connects()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Address of the live connection, if any.
    pub async fn current_address(&self) -> Option<String> {
        self.slot.read().await.live.as_ref().map(|live| live.address.clone())
    }

    /// Returns a stub bound to a healthy connection for the currently
    /// resolved address, rebuilding the connection when needed.
    ///
    /// Resolution errors are returned unchanged. A failed or timed out dial
    /// returns `ConnectFailed` and leaves no connection behind. After
    /// [`close`](Self::close) this always returns `Closed`.
    pub async fn ensure_connected(&self) -> Result<Checkout<F::Stub>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let address = self.resolver.resolve().await?;

        {
            let slot = self.slot.read().await;
            if let Some(live) = slot.live.as_ref().filter(|live| live.is_usable_for(&address)) {
                return Ok(live.checkout());
            }
        }

        let mut slot = self.slot.write().await;

        // Recheck under the write lock: another task may have rebuilt it, or closed us.
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if let Some(live) = slot.live.as_ref().filter(|live| live.is_usable_for(&address)) {
            return Ok(live.checkout());
        }

        if let Some(old) = slot.live.take() {
            self.release(&old).await;
        }

        let dialing = self.state.dialing();
        let connection = match self.dial(&address).await {
            Ok(connection) => Arc::new(connection),
            Err(source) => {
                drop(dialing);
                self.connect_failed(&address, &source);
                return Err(TransportError::ConnectFailed { address, source });
            }
        };

        let stub = self.stub_factory.build(&connection);
        let health = ConnectionHealth::new();
        let keep_alive = keepalive::spawn(
            self.role().clone(),
            address.clone(),
            Arc::clone(&connection),
            health.clone(),
            Arc::clone(&self.config),
        );
        let live = Live {
            address,
            connection,
            stub,
            health,
            keep_alive,
        };
        let checkout = live.checkout();
        let previous = slot.last_address.replace(live.address.clone());
        self.connected(previous, &live.address);
        slot.live = Some(live);
        dialing.connected();

        Ok(checkout)
    }

    /// Releases the live connection and stops its keep-alive monitor.
    ///
    /// Idempotent: the first call returns the connection's close error, if
    /// any; later calls return `Ok(())` and do nothing.
    pub async fn close(&self) -> Result<(), BoxError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let live = self.slot.write().await.live.take();
        self.state.set(ConnectionState::Closed);

        #[cfg(feature = "tracing")]
        tracing::debug!(role = %self.role(), "connection manager closed");

        self.config.event_listeners.emit(&ConnectionEvent::Closed {
            role: self.role().to_string(),
            timestamp: Instant::now(),
        });

        match live {
            Some(live) => live.connection.close().await,
            None => Ok(()),
        }
    }

    async fn dial(&self, address: &str) -> Result<C::Connection, BoxError> {
        let target = self.config.dial_target(address);
        let dial_timeout = self.config.dial_timeout;
        if dial_timeout.is_zero() {
            return self.connector.dial(&target).await;
        }
        match tokio::time::timeout(dial_timeout, self.connector.dial(&target)).await {
            Ok(result) => result,
            Err(_) => Err(Box::new(DialTimeout(dial_timeout))),
        }
    }

    /// Best-effort close of a connection being replaced.
    async fn release(&self, old: &Live<C::Connection, F::Stub>) {
        if let Err(_error) = old.connection.close().await {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                role = %self.role(),
                address = %old.address,
                error = %_error,
                "failed to close stale connection"
            );
        }
    }

    fn connected(&self, previous: Option<String>, address: &str) {
        #[cfg(feature = "tracing")]
        {
            match &previous {
                Some(from) => tracing::info!(role = %self.role(), from = %from, to = %address, "connection replaced"),
                None => tracing::info!(role = %self.role(), address = %address, "connected"),
            }
        }

        #[cfg(feature = "metrics")]
        counter!("beacon_rpc_connections_total", "role" => self.role().to_string()).increment(1);

        let event = match previous {
            Some(from) => ConnectionEvent::Replaced {
                role: self.role().to_string(),
                timestamp: Instant::now(),
                from,
                to: address.to_string(),
            },
            None => ConnectionEvent::Connected {
                role: self.role().to_string(),
                timestamp: Instant::now(),
                address: address.to_string(),
            },
        };
        self.config.event_listeners.emit(&event);
    }

    fn connect_failed(&self, address: &str, _source: &BoxError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(role = %self.role(), address = %address, error = %_source, "dial failed");

        #[cfg(feature = "metrics")]
        counter!("beacon_rpc_connect_failures_total", "role" => self.role().to_string()).increment(1);

        self.config.event_listeners.emit(&ConnectionEvent::ConnectFailed {
            role: self.role().to_string(),
            timestamp: Instant::now(),
            address: address.to_string(),
        });
    }
}

impl<R, C, F> StubProvider for ConnectionManager<R, C, F>
where
    R: Registry,
    C: Connector,
    F: StubFactory<C::Connection>,
{
    type Stub = F::Stub;

    fn checkout(&self) -> impl Future<Output = Result<Checkout<Self::Stub>, TransportError>> + Send {
        self.ensure_connected()
    }
}

impl<R, C, F> std::fmt::Debug for ConnectionManager<R, C, F>
where
    C: Connector,
    F: StubFactory<C::Connection>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

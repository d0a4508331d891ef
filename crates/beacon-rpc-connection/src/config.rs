use crate::connector::DialTarget;
use crate::events::ConnectionEvent;
use beacon_rpc_core::{EventListeners, FnListener};
use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::describe_counter;
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Default bound on establishing a connection.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_millis(200);
/// Default interval between keep-alive probes.
pub const DEFAULT_KEEP_ALIVE_TIME: Duration = Duration::from_secs(10);
/// Default bound on a single keep-alive probe.
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(20);
/// Default maximum inbound message size (100 MiB).
pub const DEFAULT_MAX_RECV_MESSAGE_SIZE: usize = 100 * 1024 * 1024;
/// Default maximum outbound message size (100 MiB).
pub const DEFAULT_MAX_SEND_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Configuration for building and watching connections.
///
/// Values are fixed once built; a manager never changes them.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub(crate) dial_timeout: Duration,
    pub(crate) keep_alive_time: Duration,
    pub(crate) keep_alive_timeout: Duration,
    pub(crate) max_recv_message_size: usize,
    pub(crate) max_send_message_size: usize,
    pub(crate) event_listeners: EventListeners<ConnectionEvent>,
}

impl ConnectionConfig {
    /// Creates a new builder.
    pub fn builder() -> ConnectionConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "beacon_rpc_connections_total",
                    "Total number of connections built"
                );
                describe_counter!(
                    "beacon_rpc_connect_failures_total",
                    "Total number of failed or timed out dials"
                );
                describe_counter!(
                    "beacon_rpc_keepalive_failures_total",
                    "Total number of connections marked broken by a failed keep-alive probe"
                );
            });
        }

        ConnectionConfigBuilder::new()
    }

    /// Bound on dialing one address. Zero means unbounded.
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Interval between keep-alive probes. Zero disables probing.
    pub fn keep_alive_time(&self) -> Duration {
        self.keep_alive_time
    }

    /// Bound on a single keep-alive probe.
    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    /// Maximum inbound message size handed to the connector.
    pub fn max_recv_message_size(&self) -> usize {
        self.max_recv_message_size
    }

    /// Maximum outbound message size handed to the connector.
    pub fn max_send_message_size(&self) -> usize {
        self.max_send_message_size
    }

    /// Everything a connector needs to dial `address`.
    pub fn dial_target(&self, address: impl Into<String>) -> DialTarget {
        DialTarget {
            address: address.into(),
            dial_timeout: self.dial_timeout,
            keep_alive_time: self.keep_alive_time,
            keep_alive_timeout: self.keep_alive_timeout,
            max_recv_message_size: self.max_recv_message_size,
            max_send_message_size: self.max_send_message_size,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dial_timeout", &self.dial_timeout)
            .field("keep_alive_time", &self.keep_alive_time)
            .field("keep_alive_timeout", &self.keep_alive_timeout)
            .field("max_recv_message_size", &self.max_recv_message_size)
            .field("max_send_message_size", &self.max_send_message_size)
            .field("listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Builder for [`ConnectionConfig`].
pub struct ConnectionConfigBuilder {
    dial_timeout: Duration,
    keep_alive_time: Duration,
    keep_alive_timeout: Duration,
    max_recv_message_size: usize,
    max_send_message_size: usize,
    event_listeners: EventListeners<ConnectionEvent>,
}

impl Default for ConnectionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - dial_timeout: 200ms
    /// - keep_alive_time: 10s
    /// - keep_alive_timeout: 20s
    /// - max message sizes: 100 MiB each way
    pub fn new() -> Self {
        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            keep_alive_time: DEFAULT_KEEP_ALIVE_TIME,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            max_recv_message_size: DEFAULT_MAX_RECV_MESSAGE_SIZE,
            max_send_message_size: DEFAULT_MAX_SEND_MESSAGE_SIZE,
            event_listeners: EventListeners::new(),
        }
    }

    /// Bounds each dial. A dial that does not finish in time fails with
    /// `ConnectFailed`. Zero leaves dials unbounded.
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Interval between keep-alive probes. Zero disables the monitor.
    pub fn keep_alive_time(mut self, interval: Duration) -> Self {
        self.keep_alive_time = interval;
        self
    }

    /// Bound on one keep-alive round trip. No reply in time marks
    /// the connection broken. Zero waits for the reply unbounded.
    pub fn keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    /// Maximum inbound message size.
    pub fn max_recv_message_size(mut self, bytes: usize) -> Self {
        self.max_recv_message_size = bytes;
        self
    }

    /// Maximum outbound message size.
    pub fn max_send_message_size(mut self, bytes: usize) -> Self {
        self.max_send_message_size = bytes;
        self
    }

    /// Registers a callback when a connection is built where none existed.
    pub fn on_connected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConnectionEvent::Connected { address, .. } = event {
                f(address);
            }
        }));
        self
    }

    /// Registers a callback when a connection is replaced.
    ///
    /// # Callback Signature
    /// `Fn(&str, &str)`: the old address and the new one. They are equal when
    /// a broken connection was rebuilt against the same address.
    pub fn on_replaced<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConnectionEvent::Replaced { from, to, .. } = event {
                f(from, to);
            }
        }));
        self
    }

    /// Registers a callback when a dial fails.
    pub fn on_connect_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConnectionEvent::ConnectFailed { address, .. } = event {
                f(address);
            }
        }));
        self
    }

    /// Registers a callback when a keep-alive probe fails.
    pub fn on_keep_alive_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConnectionEvent::KeepAliveFailed { address, .. } = event {
                f(address);
            }
        }));
        self
    }

    /// Registers a callback when the manager is closed.
    pub fn on_closed<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, ConnectionEvent::Closed { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            dial_timeout: self.dial_timeout,
            keep_alive_time: self.keep_alive_time,
            keep_alive_timeout: self.keep_alive_timeout,
            max_recv_message_size: self.max_recv_message_size,
            max_send_message_size: self.max_send_message_size,
            event_listeners: self.event_listeners,
        }
    }
}

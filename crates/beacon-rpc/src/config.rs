//! Plain-data client configuration for external configuration sources.

use beacon_rpc_connection::{
    ConnectionConfig, ConnectionConfigBuilder, DEFAULT_DIAL_TIMEOUT, DEFAULT_KEEP_ALIVE_TIME,
    DEFAULT_KEEP_ALIVE_TIMEOUT, DEFAULT_MAX_RECV_MESSAGE_SIZE, DEFAULT_MAX_SEND_MESSAGE_SIZE,
};
use beacon_rpc_retry::{
    RetryConfig, RetryConfigBuilder, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
};
use std::time::Duration;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Connection parameters. Durations are whole milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectionSettings {
    /// Bound on dialing one address; 0 leaves dials unbounded.
    pub dial_timeout_ms: u64,
    /// Interval between keep-alive probes; 0 disables probing.
    pub keep_alive_time_ms: u64,
    /// Bound on one keep-alive probe.
    pub keep_alive_timeout_ms: u64,
    /// Maximum inbound message size in bytes.
    pub max_recv_message_size: usize,
    /// Maximum outbound message size in bytes.
    pub max_send_message_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            dial_timeout_ms: millis(DEFAULT_DIAL_TIMEOUT),
            keep_alive_time_ms: millis(DEFAULT_KEEP_ALIVE_TIME),
            keep_alive_timeout_ms: millis(DEFAULT_KEEP_ALIVE_TIMEOUT),
            max_recv_message_size: DEFAULT_MAX_RECV_MESSAGE_SIZE,
            max_send_message_size: DEFAULT_MAX_SEND_MESSAGE_SIZE,
        }
    }
}

impl ConnectionSettings {
    /// A connection config builder preloaded with these values, to which
    /// event callbacks can still be added.
    pub fn to_builder(&self) -> ConnectionConfigBuilder {
        ConnectionConfig::builder()
            .dial_timeout(Duration::from_millis(self.dial_timeout_ms))
            .keep_alive_time(Duration::from_millis(self.keep_alive_time_ms))
            .keep_alive_timeout(Duration::from_millis(self.keep_alive_timeout_ms))
            .max_recv_message_size(self.max_recv_message_size)
            .max_send_message_size(self.max_send_message_size)
    }
}

/// Retry parameters. Durations are whole milliseconds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetrySettings {
    /// Total attempts per call, including the first. 0 is treated as 1.
    pub max_attempts: usize,
    /// Delay after the first failed attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on any delay.
    pub max_backoff_ms: u64,
    /// Growth factor between delays.
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: millis(DEFAULT_INITIAL_BACKOFF),
            max_backoff_ms: millis(DEFAULT_MAX_BACKOFF),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetrySettings {
    /// A retry config builder preloaded with these values. The error
    /// classifier, name and callbacks are added on the builder.
    pub fn to_builder<E>(&self) -> RetryConfigBuilder<E> {
        RetryConfig::builder()
            .max_attempts(self.max_attempts)
            .exponential_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                self.backoff_multiplier,
                Duration::from_millis(self.max_backoff_ms),
            )
    }
}

/// Everything a [`Client`](crate::Client) needs besides its collaborators.
///
/// With the `serde` feature this can be read from TOML, JSON or YAML; every
/// field is optional and falls back to its default.
///
/// ```rust
/// use beacon_rpc::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert_eq!(config.retry.max_attempts, 10);
/// assert_eq!(config.connection.dial_timeout_ms, 200);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    /// Connection parameters.
    pub connection: ConnectionSettings,
    /// Retry parameters.
    pub retry: RetrySettings,
}

//! A discovery-backed RPC client.
//!
//! `beacon-rpc` lets a caller invoke operations on a logical service whose
//! address is not fixed but discovered at runtime through a shared registry,
//! and whose connection may go stale, break or point at a dead instance.
//!
//! The [`Client`] composes three components:
//!
//! - [`AddressResolver`]: role to address, re-queried on every attempt
//! - [`ConnectionManager`]: one lazily (re)built connection and stub
//! - [`RetryExecutor`]: bounded attempts with capped exponential backoff
//!
//! ```text
//! Client::invoke(call)
//!   -> RetryExecutor loop
//!        -> ConnectionManager::ensure_connected()
//!             -> AddressResolver::resolve()
//!        -> call(stub)
//!        -> classify: return, or back off and retry
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use beacon_rpc::{
//!     BoxError, CancellationToken, Client, ClientConfig, Connection, DialTarget,
//!     MemoryRegistry, ServiceInstance,
//! };
//! use std::sync::Arc;
//!
//! struct Channel(String);
//!
//! impl Connection for Channel {
//!     async fn close(&self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Debug)]
//! enum Status {
//!     Unavailable,
//!     InvalidArgument,
//! }
//!
//! # async fn example() -> Result<(), BoxError> {
//! let registry = Arc::new(MemoryRegistry::new());
//! registry.register(ServiceInstance::new("indexcoord", "1", "10.0.0.1:31000"));
//!
//! let client = Client::from_config(
//!     "indexcoord",
//!     registry,
//!     |target: &DialTarget| {
//!         let address = target.address().to_string();
//!         async move { Ok::<_, BoxError>(Channel(address)) }
//!     },
//!     |channel: &Arc<Channel>| Arc::clone(channel),
//!     &ClientConfig::default(),
//!     |status: &Status| matches!(status, Status::Unavailable),
//! );
//!
//! let cancel = CancellationToken::new();
//! let address = client
//!     .invoke(&cancel, |stub| async move { Ok::<_, Status>(stub.0.clone()) })
//!     .await
//!     .map_err(|e| format!("{:?}", e))?;
//! assert_eq!(address, "10.0.0.1:31000");
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every failure is a [`ClientError`]. Connectivity problems (no registered
//! instance, registry down, dial failure, or a call error the classifier
//! marks transient) are retried and, once attempts run out, surface as
//! [`ClientError::RetriesExhausted`] wrapping the last one. Remote rejections
//! and cancellation are returned immediately.
//!
//! # Feature Flags
//!
//! - `serde`: `Deserialize`/`Serialize` for [`ClientConfig`]
//! - `tracing`: structured logs from every component
//! - `metrics`: counters and histograms through the `metrics` facade

mod client;
mod config;

pub use client::Client;
pub use config::{ClientConfig, ConnectionSettings, RetrySettings};

pub use beacon_rpc_connection::{
    Connection, ConnectionConfig, ConnectionConfigBuilder, ConnectionEvent, ConnectionManager,
    ConnectionState, Connector, DialTarget, DialTimeout, MakeConnector, StubFactory,
};
pub use beacon_rpc_core::{
    BoxError, Checkout, ClientError, ClientEvent, ConnectionHealth, EventListener,
    EventListeners, FnListener, StubProvider, TransportError,
};
pub use beacon_rpc_discovery::{
    AddressResolver, Instances, MemoryRegistry, Registry, RegistryUnavailable, Role,
    SelectionStrategy, ServiceInstance,
};
pub use beacon_rpc_retry::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
    RetryConfig, RetryConfigBuilder, RetryEvent, RetryExecutor,
};
pub use tokio_util::sync::CancellationToken;

//! Connections that follow a role's resolved address.
//!
//! [`ConnectionManager`] owns at most one live [`Connection`] and the stub
//! built on top of it. Each checkout re-resolves the role; the connection is
//! rebuilt when the address moved or when it was marked broken, either by a
//! caller reporting a connection-level failure or by the keep-alive monitor.
//!
//! Transports plug in through two collaborators:
//!
//! - a [`Connector`] that dials a [`DialTarget`] (or any tower make-service
//!   wrapped in [`MakeConnector`])
//! - a [`StubFactory`] that builds the typed stub from a connection
//!
//! # Examples
//!
//! ```rust
//! use beacon_rpc_connection::{Connection, ConnectionConfig, ConnectionManager, DialTarget};
//! use beacon_rpc_core::BoxError;
//! use beacon_rpc_discovery::{AddressResolver, MemoryRegistry, ServiceInstance};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Channel(String);
//!
//! impl Connection for Channel {
//!     async fn close(&self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), beacon_rpc_core::TransportError> {
//! let registry = MemoryRegistry::new();
//! registry.register(ServiceInstance::new("indexcoord", "1", "10.0.0.1:31000"));
//!
//! let manager = ConnectionManager::new(
//!     AddressResolver::new("indexcoord", registry),
//!     |target: &DialTarget| {
//!         let address = target.address().to_string();
//!         async move { Ok::<_, BoxError>(Channel(address)) }
//!     },
//!     |channel: &Arc<Channel>| Arc::clone(channel),
//!     ConnectionConfig::builder()
//!         .dial_timeout(Duration::from_millis(500))
//!         .build(),
//! );
//!
//! let checkout = manager.ensure_connected().await?;
//! assert_eq!(checkout.address(), "10.0.0.1:31000");
//! # Ok(())
//! # }
//! ```

mod config;
mod connector;
mod events;
mod keepalive;
mod manager;
mod state;

pub use config::{
    ConnectionConfig, ConnectionConfigBuilder, DEFAULT_DIAL_TIMEOUT, DEFAULT_KEEP_ALIVE_TIME,
    DEFAULT_KEEP_ALIVE_TIMEOUT, DEFAULT_MAX_RECV_MESSAGE_SIZE, DEFAULT_MAX_SEND_MESSAGE_SIZE,
};
pub use connector::{Connection, Connector, DialTarget, MakeConnector, StubFactory};
pub use events::ConnectionEvent;
pub use manager::{ConnectionManager, DialTimeout};
pub use state::ConnectionState;

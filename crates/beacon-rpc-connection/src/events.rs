use beacon_rpc_core::ClientEvent;
use std::time::Instant;

/// Events emitted by the connection manager.
///
/// `role` is the role the manager connects to.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A connection was built where none existed before.
    Connected {
        role: String,
        timestamp: Instant,
        address: String,
    },
    /// A stale or broken connection was replaced by a new one.
    Replaced {
        role: String,
        timestamp: Instant,
        from: String,
        to: String,
    },
    /// Dialing a resolved address failed or timed out.
    ConnectFailed {
        role: String,
        timestamp: Instant,
        address: String,
    },
    /// A keep-alive probe failed; the connection is now marked broken.
    KeepAliveFailed {
        role: String,
        timestamp: Instant,
        address: String,
    },
    /// The manager was closed.
    Closed {
        role: String,
        timestamp: Instant,
    },
}

impl ClientEvent for ConnectionEvent {
    fn kind(&self) -> &'static str {
        match self {
            ConnectionEvent::Connected { .. } => "Connected",
            ConnectionEvent::Replaced { .. } => "Replaced",
            ConnectionEvent::ConnectFailed { .. } => "ConnectFailed",
            ConnectionEvent::KeepAliveFailed { .. } => "KeepAliveFailed",
            ConnectionEvent::Closed { .. } => "Closed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConnectionEvent::Connected { timestamp, .. }
            | ConnectionEvent::Replaced { timestamp, .. }
            | ConnectionEvent::ConnectFailed { timestamp, .. }
            | ConnectionEvent::KeepAliveFailed { timestamp, .. }
            | ConnectionEvent::Closed { timestamp, .. } => *timestamp,
        }
    }

    fn role(&self) -> &str {
        match self {
            ConnectionEvent::Connected { role, .. }
            | ConnectionEvent::Replaced { role, .. }
            | ConnectionEvent::ConnectFailed { role, .. }
            | ConnectionEvent::KeepAliveFailed { role, .. }
            | ConnectionEvent::Closed { role, .. } => role,
        }
    }

    fn address(&self) -> Option<&str> {
        match self {
            ConnectionEvent::Connected { address, .. }
            | ConnectionEvent::ConnectFailed { address, .. }
            | ConnectionEvent::KeepAliveFailed { address, .. } => Some(address),
            ConnectionEvent::Replaced { to, .. } => Some(to),
            ConnectionEvent::Closed { .. } => None,
        }
    }
}

//! The seam between the retry loop and whatever owns the connection.

use crate::error::TransportError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared broken/healthy flag of one live connection.
///
/// Every [`Checkout`] carries the flag of the connection its stub is bound to,
/// so a caller can only invalidate the connection it actually used. Marking a
/// connection broken never tears it down; the owner rebuilds it on the next
/// checkout.
#[derive(Clone, Debug, Default)]
pub struct ConnectionHealth {
    broken: Arc<AtomicBool>,
}

impl ConnectionHealth {
    /// Creates a flag for a fresh, healthy connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the connection as unusable.
    pub fn mark_broken(&self) {
        self.broken.store(true, Ordering::Release);
    }

    /// Returns `true` once the connection has been marked broken.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }
}

/// A stub handed out for one attempt, together with where it points.
#[derive(Clone, Debug)]
pub struct Checkout<S> {
    stub: S,
    address: String,
    health: ConnectionHealth,
}

impl<S> Checkout<S> {
    /// Creates a checkout.
    pub fn new(stub: S, address: impl Into<String>, health: ConnectionHealth) -> Self {
        Self {
            stub,
            address: address.into(),
            health,
        }
    }

    /// The address the stub's connection was dialed to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Health flag of the underlying connection.
    pub fn health(&self) -> &ConnectionHealth {
        &self.health
    }

    /// Borrows the stub.
    pub fn stub(&self) -> &S {
        &self.stub
    }

    /// Splits the checkout into the stub and its health flag.
    pub fn into_parts(self) -> (S, ConnectionHealth) {
        (self.stub, self.health)
    }
}

/// Something that can hand out a stub bound to a live connection.
///
/// Implemented by the connection manager; the retry executor only depends on
/// this trait.
pub trait StubProvider: Send + Sync {
    /// The typed handle remote calls are issued through.
    type Stub: Clone + Send + Sync + 'static;

    /// Returns a stub bound to a connection for the currently resolved address,
    /// (re)building the connection first when needed.
    fn checkout(&self) -> impl Future<Output = Result<Checkout<Self::Stub>, TransportError>> + Send;
}

impl<P> StubProvider for Arc<P>
where
    P: StubProvider,
{
    type Stub = P::Stub;

    fn checkout(&self) -> impl Future<Output = Result<Checkout<Self::Stub>, TransportError>> + Send {
        (**self).checkout()
    }
}

//! Collaborator traits for dialing addresses and building stubs.

use beacon_rpc_core::BoxError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower::{Service, ServiceExt};

/// Everything needed to dial one resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialTarget {
    pub(crate) address: String,
    pub(crate) dial_timeout: Duration,
    pub(crate) keep_alive_time: Duration,
    pub(crate) keep_alive_timeout: Duration,
    pub(crate) max_recv_message_size: usize,
    pub(crate) max_send_message_size: usize,
}

impl DialTarget {
    /// The `host:port` to dial.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The dial bound the manager enforces; transports may also apply it
    /// to their own handshake.
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Transport-level keep-alive interval (zero when disabled).
    pub fn keep_alive_time(&self) -> Duration {
        self.keep_alive_time
    }

    /// Transport-level keep-alive timeout.
    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    /// Maximum inbound message size.
    pub fn max_recv_message_size(&self) -> usize {
        self.max_recv_message_size
    }

    /// Maximum outbound message size.
    pub fn max_send_message_size(&self) -> usize {
        self.max_send_message_size
    }
}

/// An established transport to one address.
pub trait Connection: Send + Sync + 'static {
    /// Releases the transport.
    fn close(&self) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Checks that the transport is still usable.
    ///
    /// Called periodically by the keep-alive monitor. The default assumes the
    /// transport is always healthy.
    fn probe(&self) -> impl Future<Output = Result<(), BoxError>> + Send {
        async { Ok(()) }
    }
}

/// Dials addresses.
///
/// # Examples
///
/// Using a closure (via blanket impl):
///
/// ```rust
/// use beacon_rpc_connection::{Connection, Connector, DialTarget};
/// use beacon_rpc_core::BoxError;
///
/// struct Channel(String);
///
/// impl Connection for Channel {
///     async fn close(&self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
///
/// let connector = |target: &DialTarget| {
///     let address = target.address().to_string();
///     async move { Ok::<_, BoxError>(Channel(address)) }
/// };
/// # fn assert_connector<C: Connector>(_: &C) {}
/// # assert_connector(&connector);
/// ```
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced.
    type Connection: Connection;

    /// Dials `target`.
    fn dial(
        &self,
        target: &DialTarget,
    ) -> impl Future<Output = Result<Self::Connection, BoxError>> + Send;
}

impl<F, Fut, C> Connector for F
where
    F: Fn(&DialTarget) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, BoxError>> + Send,
    C: Connection,
{
    type Connection = C;

    fn dial(&self, target: &DialTarget) -> impl Future<Output = Result<C, BoxError>> + Send {
        self(target)
    }
}

/// Adapts a tower `Service<DialTarget>` (a make-service) into a [`Connector`].
///
/// The service is cloned per dial and driven to readiness before it is
/// called, so backpressure and middleware on the dialing service are honoured.
///
/// # Examples
///
/// ```rust
/// use beacon_rpc_connection::{Connection, Connector, DialTarget, MakeConnector};
/// use beacon_rpc_core::BoxError;
///
/// struct Channel;
///
/// impl Connection for Channel {
///     async fn close(&self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
///
/// let connector = MakeConnector::new(tower::service_fn(|_target: DialTarget| async {
///     Ok::<_, BoxError>(Channel)
/// }));
/// # fn assert_connector<C: Connector>(_: &C) {}
/// # assert_connector(&connector);
/// ```
#[derive(Debug, Clone)]
pub struct MakeConnector<M> {
    make: M,
}

impl<M> MakeConnector<M> {
    /// Wraps a make-service.
    pub fn new(make: M) -> Self {
        Self { make }
    }

    /// Returns the inner service.
    pub fn into_inner(self) -> M {
        self.make
    }
}

impl<M, C> Connector for MakeConnector<M>
where
    M: Service<DialTarget, Response = C> + Clone + Send + Sync + 'static,
    M::Error: Into<BoxError>,
    M::Future: Send,
    C: Connection,
{
    type Connection = C;

    fn dial(&self, target: &DialTarget) -> impl Future<Output = Result<C, BoxError>> + Send {
        let make = self.make.clone();
        let target = target.clone();
        async move { make.oneshot(target).await.map_err(Into::into) }
    }
}

/// Builds the typed stub calls are issued through from a live connection.
///
/// A stub usually wraps a clone of the connection handle; it is cloned for
/// every attempt.
pub trait StubFactory<C>: Send + Sync + 'static {
    /// The stub type produced.
    type Stub: Clone + Send + Sync + 'static;

    /// Builds a stub bound to `connection`.
    fn build(&self, connection: &Arc<C>) -> Self::Stub;
}

impl<C, F, S> StubFactory<C> for F
where
    F: Fn(&Arc<C>) -> S + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    type Stub = S;

    fn build(&self, connection: &Arc<C>) -> S {
        self(connection)
    }
}

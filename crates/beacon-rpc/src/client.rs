use crate::config::ClientConfig;
use beacon_rpc_connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, Connector, StubFactory,
};
use beacon_rpc_core::{BoxError, ClientError};
use beacon_rpc_discovery::{AddressResolver, Registry, Role};
use beacon_rpc_retry::{RetryConfig, RetryExecutor};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A long-lived client for one logical remote service.
///
/// Owns exactly one [`ConnectionManager`] and shares the registry with the
/// rest of the process. Cheap per-call operations go through
/// [`invoke`](Self::invoke); the owner tears it down with
/// [`close`](Self::close). `Client` is `Send + Sync`; wrap it in an `Arc` to
/// share it between tasks.
///
/// # Type Parameters
///
/// - `R`: the discovery [`Registry`]
/// - `C`: the [`Connector`] that dials addresses
/// - `F`: the [`StubFactory`] that builds stubs from connections
/// - `E`: the error type of remote calls
pub struct Client<R, C, F, E>
where
    C: Connector,
    F: StubFactory<C::Connection>,
{
    executor: RetryExecutor<ConnectionManager<R, C, F>, E>,
}

impl<R, C, F, E> Client<R, C, F, E>
where
    R: Registry,
    C: Connector,
    F: StubFactory<C::Connection>,
{
    /// Opens a client for `role`. Nothing is resolved or dialed until the
    /// first [`invoke`](Self::invoke).
    pub fn open(
        role: impl Into<Role>,
        registry: Arc<R>,
        connector: C,
        stub_factory: F,
        connection: ConnectionConfig,
        retry: RetryConfig<E>,
    ) -> Self {
        Self::with_resolver(
            AddressResolver::from_shared(role, registry),
            connector,
            stub_factory,
            connection,
            retry,
        )
    }

    /// Opens a client around a preconfigured resolver, e.g. one using a
    /// non-default selection strategy.
    pub fn with_resolver(
        resolver: AddressResolver<R>,
        connector: C,
        stub_factory: F,
        connection: ConnectionConfig,
        retry: RetryConfig<E>,
    ) -> Self {
        let manager = ConnectionManager::new(resolver, connector, stub_factory, connection);
        Self {
            executor: RetryExecutor::new(manager, retry),
        }
    }

    /// Opens a client from plain configuration.
    ///
    /// `is_transient` classifies remote call errors: `true` means retry on a
    /// fresh connection, `false` means the remote side rejected the request.
    /// The role doubles as the name in events and metrics.
    pub fn from_config<P>(
        role: impl Into<Role>,
        registry: Arc<R>,
        connector: C,
        stub_factory: F,
        config: &ClientConfig,
        is_transient: P,
    ) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let role = role.into();
        let retry = config
            .retry
            .to_builder()
            .retry_on(is_transient)
            .name(role.as_str())
            .build();
        Self::open(
            role,
            registry,
            connector,
            stub_factory,
            config.connection.to_builder().build(),
            retry,
        )
    }

    /// Runs `call` against the current stub, retrying per the retry
    /// configuration.
    ///
    /// `call` is invoked once per attempt with a fresh clone of the stub. A
    /// successful result is returned as-is, whatever it contains.
    ///
    /// # Examples
    ///
    /// A typed forwarding method built on `invoke`:
    ///
    /// ```rust,ignore
    /// async fn get_job_state(
    ///     client: &IndexClient,
    ///     cancel: &CancellationToken,
    ///     request: JobStateRequest,
    /// ) -> Result<JobStateResponse, ClientError<Status>> {
    ///     client
    ///         .invoke(cancel, |stub| {
    ///             let request = request.clone();
    ///             async move { stub.get_job_state(request).await }
    ///         })
    ///         .await
    /// }
    /// ```
    pub async fn invoke<T, Call, Fut>(
        &self,
        cancel: &CancellationToken,
        call: Call,
    ) -> Result<T, ClientError<E>>
    where
        Call: FnMut(F::Stub) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.executor.invoke(cancel, call).await
    }

    /// Releases the current connection and its keep-alive monitor.
    ///
    /// Idempotent; see [`ConnectionManager::close`]. Any later `invoke`
    /// fails immediately with `TransportError::Closed`.
    pub async fn close(&self) -> Result<(), BoxError> {
        self.manager().close().await
    }

    /// The role this client talks to.
    pub fn role(&self) -> &Role {
        self.manager().role()
    }

    /// Lifecycle state of the underlying connection.
    pub fn state(&self) -> ConnectionState {
        self.manager().state()
    }

    /// Address of the live connection, if any.
    pub async fn current_address(&self) -> Option<String> {
        self.manager().current_address().await
    }

    /// The connection manager.
    pub fn manager(&self) -> &ConnectionManager<R, C, F> {
        self.executor.provider()
    }

    /// The retry configuration.
    pub fn retry_config(&self) -> &RetryConfig<E> {
        self.executor.config()
    }
}

impl<R, C, F, E> std::fmt::Debug for Client<R, C, F, E>
where
    C: Connector,
    F: StubFactory<C::Connection>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("executor", &self.executor).finish()
    }
}

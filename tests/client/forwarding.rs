//! A typed service client layered over `Client::invoke`, the way generated
//! forwarding methods use it.

use crate::common::{memory_registry, Channel, Status, TestConnector, ROLE};
use beacon_rpc::{
    CancellationToken, Client, ClientError, ConnectionConfig, MemoryRegistry, RetryConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct IndexInfo {
    name: String,
    served_by: String,
}

/// Typed stub over a fake channel.
#[derive(Clone)]
struct IndexServiceStub {
    channel: Arc<Channel>,
}

impl IndexServiceStub {
    async fn describe_index(&self, name: &str) -> Result<Option<IndexInfo>, Status> {
        if name.is_empty() {
            return Err(Status::InvalidArgument);
        }
        if name.starts_with("missing") {
            return Ok(None);
        }
        Ok(Some(IndexInfo {
            name: name.to_string(),
            served_by: self.channel.address.clone(),
        }))
    }
}

fn index_stub(channel: &Arc<Channel>) -> IndexServiceStub {
    IndexServiceStub {
        channel: Arc::clone(channel),
    }
}

type StubFn = fn(&Arc<Channel>) -> IndexServiceStub;

struct IndexCoordClient {
    inner: Client<MemoryRegistry, TestConnector, StubFn, Status>,
    invocations: AtomicUsize,
}

impl IndexCoordClient {
    fn new(registry: MemoryRegistry, connector: TestConnector) -> Self {
        let inner = Client::open(
            ROLE,
            Arc::new(registry),
            connector,
            index_stub as StubFn,
            ConnectionConfig::builder()
                .keep_alive_time(Duration::ZERO)
                .build(),
            RetryConfig::builder()
                .max_attempts(3)
                .fixed_backoff(Duration::from_millis(5))
                .retry_on(|status: &Status| *status == Status::Unavailable)
                .name(ROLE)
                .build(),
        );
        Self {
            inner,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Every error and every empty answer becomes an error; a value is only
    /// returned alongside success.
    async fn describe_index(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<IndexInfo, ClientError<Status>> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let info = self
            .inner
            .invoke(cancel, |stub| {
                let name = name.to_string();
                async move { stub.describe_index(&name).await }
            })
            .await?;
        info.ok_or_else(|| ClientError::RemoteRejected(Status::NotFound(name.to_string())))
    }
}

fn client(connector: TestConnector) -> IndexCoordClient {
    IndexCoordClient::new(memory_registry(&[("1", "10.0.0.1:31000")]), connector)
}

#[tokio::test]
async fn forwards_typed_response() {
    let client = client(TestConnector::new());

    let info = client
        .describe_index(&CancellationToken::new(), "embeddings")
        .await
        .unwrap();

    assert_eq!(
        info,
        IndexInfo {
            name: "embeddings".to_string(),
            served_by: "10.0.0.1:31000".to_string(),
        }
    );
}

#[tokio::test]
async fn empty_answer_becomes_not_found() {
    let client = client(TestConnector::new());

    let err = client
        .describe_index(&CancellationToken::new(), "missing-index")
        .await
        .unwrap_err();

    assert_eq!(
        err.remote_error(),
        Some(Status::NotFound("missing-index".to_string()))
    );
}

#[tokio::test]
async fn rejection_passes_through() {
    let client = client(TestConnector::new());

    let err = client
        .describe_index(&CancellationToken::new(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RemoteRejected(Status::InvalidArgument)));
}

#[tokio::test]
async fn cancelled_token_short_circuits_before_invoke() {
    let connector = TestConnector::new();
    let client = client(connector.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.describe_index(&cancel, "embeddings").await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(client.invocations.load(Ordering::SeqCst), 0);
    assert_eq!(connector.dial_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn connectivity_failure_is_not_a_value() {
    let connector = TestConnector::new();
    connector.refuse("10.0.0.1:31000");
    let client = client(connector.clone());

    let result = client
        .describe_index(&CancellationToken::new(), "embeddings")
        .await;

    let err = result.unwrap_err();
    assert!(err.is_retries_exhausted());
    assert_eq!(connector.dial_count(), 3);
}

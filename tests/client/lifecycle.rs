use crate::common::{
    memory_registry, open, retry, stub, Channel, Status, StubFn, TestConnector, ROLE,
};
use beacon_rpc::{
    AddressResolver, CancellationToken, Client, ClientConfig, ClientError, ConnectionConfig,
    ConnectionManager, ConnectionState, RetryExecutor, TransportError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn close_is_idempotent() {
    let connector = TestConnector::new();
    let client = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        retry(3).build(),
    );
    client
        .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(()) })
        .await
        .unwrap();

    assert!(client.close().await.is_ok());
    assert!(client.close().await.is_ok());

    assert_eq!(connector.dial_count(), 1);
    assert_eq!(connector.closes(), 1);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn close_before_first_call_never_dials() {
    let connector = TestConnector::new();
    let client = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        retry(3).build(),
    );

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.close().await.is_ok());
    assert!(client.close().await.is_ok());
    assert_eq!(connector.dial_count(), 0);
    assert_eq!(connector.closes(), 0);
}

#[tokio::test(start_paused = true)]
async fn calls_after_close_fail_without_retrying() {
    let connector = TestConnector::new();
    let client = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        retry(5).build(),
    );
    client.close().await.unwrap();
    let calls = AtomicUsize::new(0);

    let start = Instant::now();
    let err = client
        .invoke(&CancellationToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Status>(()) }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::Closed)));
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(connector.dial_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_keep_alive_forces_rebuild() {
    let keep_alive_failures = Arc::new(AtomicUsize::new(0));
    let replaced = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::clone(&keep_alive_failures);
    let replacements = Arc::clone(&replaced);
    let connector = TestConnector::new();
    let client = Client::open(
        ROLE,
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        stub as StubFn,
        ConnectionConfig::builder()
            .keep_alive_time(Duration::from_secs(1))
            .keep_alive_timeout(Duration::from_millis(500))
            .on_keep_alive_failed(move |_| {
                failures.fetch_add(1, Ordering::SeqCst);
            })
            .on_replaced(move |from, to| {
                replacements
                    .lock()
                    .unwrap()
                    .push((from.to_string(), to.to_string()));
            })
            .build(),
        retry(3).build(),
    );
    let cancel = CancellationToken::new();

    let first = client
        .invoke(&cancel, |stub| async move { Ok::<_, Status>(stub.serial) })
        .await
        .unwrap();
    assert_eq!(first, 1);

    connector.set_healthy(false);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(keep_alive_failures.load(Ordering::SeqCst), 1);
    connector.set_healthy(true);

    let second = client
        .invoke(&cancel, |stub| async move { Ok::<_, Status>(stub.serial) })
        .await
        .unwrap();
    assert_eq!(second, 2);
    assert_eq!(connector.closes(), 1);
    assert_eq!(
        *replaced.lock().unwrap(),
        vec![("10.0.0.1:31000".to_string(), "10.0.0.1:31000".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn healthy_keep_alive_leaves_connection_alone() {
    let connector = TestConnector::new();
    let client = Client::open(
        ROLE,
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        stub as StubFn,
        ConnectionConfig::builder()
            .keep_alive_time(Duration::from_secs(1))
            .build(),
        retry(3).build(),
    );
    let cancel = CancellationToken::new();

    client
        .invoke(&cancel, |_| async { Ok::<_, Status>(()) })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    client
        .invoke(&cancel, |_| async { Ok::<_, Status>(()) })
        .await
        .unwrap();

    assert_eq!(connector.dial_count(), 1);
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn client_from_json_configuration() {
    let config: ClientConfig = serde_json::from_str(
        r#"{
            "connection": { "dial_timeout_ms": 1000, "keep_alive_time_ms": 0 },
            "retry": { "max_attempts": 2, "initial_backoff_ms": 1 }
        }"#,
    )
    .unwrap();
    let connector = TestConnector::new();
    let client = Client::from_config(
        ROLE,
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        stub as StubFn,
        &config,
        |status: &Status| *status == Status::Unavailable,
    );

    assert_eq!(client.manager().config().dial_timeout(), Duration::from_millis(1000));
    assert_eq!(client.retry_config().policy().max_attempts(), 2);
    assert_eq!(client.retry_config().name(), ROLE);

    let channel: Arc<Channel> = client
        .invoke(&CancellationToken::new(), |stub| async move { Ok::<_, Status>(stub) })
        .await
        .unwrap();
    assert_eq!(channel.address, "10.0.0.1:31000");
    assert_eq!(client.current_address().await.as_deref(), Some("10.0.0.1:31000"));
}

#[tokio::test]
async fn executors_share_one_manager() {
    let connector = TestConnector::new();
    let manager = Arc::new(ConnectionManager::new(
        AddressResolver::new(ROLE, memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        stub as StubFn,
        ConnectionConfig::builder()
            .keep_alive_time(Duration::ZERO)
            .build(),
    ));
    let patient = RetryExecutor::new(Arc::clone(&manager), retry(5).build());
    let hasty = RetryExecutor::new(Arc::clone(&manager), retry(1).build());
    let cancel = CancellationToken::new();

    let first = patient
        .invoke(&cancel, |stub| async move { Ok::<_, Status>(stub.serial) })
        .await
        .unwrap();
    let second = hasty
        .invoke(&cancel, |stub| async move { Ok::<_, Status>(stub.serial) })
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(connector.dial_count(), 1);

    manager.close().await.unwrap();
    let err = hasty
        .invoke(&cancel, |_| async { Ok::<_, Status>(()) })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Closed)));
}

//! Client metrics regression tests

use super::helpers::*;
use crate::common::{memory_registry, open, retry, stub, Status, StubFn, TestConnector, ROLE};
use beacon_rpc::{CancellationToken, Client, ConnectionConfig, MemoryRegistry};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn successful_call_after_retry_metrics() {
    init_recorder();

    let registry = Arc::new(memory_registry(&[("1", "10.0.0.1:31000")]));
    let client = open(
        registry,
        TestConnector::new(),
        retry(3).name("metrics_success").build(),
    );
    let calls = AtomicUsize::new(0);

    let _ = client
        .invoke(&CancellationToken::new(), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Status::Unavailable)
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert_counter_exists("beacon_rpc_calls_total");
    assert_metric_has_labels(
        "beacon_rpc_calls_total",
        &[("client", "metrics_success"), ("outcome", "success")],
    );

    assert_counter_exists("beacon_rpc_retries_total");
    assert_metric_has_labels("beacon_rpc_retries_total", &[("client", "metrics_success")]);

    assert_histogram_exists("beacon_rpc_backoff_seconds");
    assert_metric_has_labels("beacon_rpc_backoff_seconds", &[("client", "metrics_success")]);

    assert_counter_exists("beacon_rpc_resolve_total");
    assert_metric_has_labels(
        "beacon_rpc_resolve_total",
        &[("role", "indexcoord"), ("outcome", "resolved")],
    );

    assert_counter_exists("beacon_rpc_connections_total");
    assert_metric_has_labels("beacon_rpc_connections_total", &[("role", "indexcoord")]);
}

#[tokio::test]
#[serial]
async fn failure_outcome_metrics() {
    init_recorder();

    let empty = open(
        Arc::new(MemoryRegistry::new()),
        TestConnector::new(),
        retry(2).name("metrics_exhausted").build(),
    );
    let _ = empty
        .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(()) })
        .await;
    assert_metric_has_labels(
        "beacon_rpc_calls_total",
        &[("client", "metrics_exhausted"), ("outcome", "exhausted")],
    );
    assert_metric_has_labels(
        "beacon_rpc_resolve_total",
        &[("role", "indexcoord"), ("outcome", "empty")],
    );

    let registry = memory_registry(&[("1", "10.0.0.1:31000")]);
    registry.set_available(false);
    let unreachable = open(
        Arc::new(registry),
        TestConnector::new(),
        retry(1).name("metrics_unreachable").build(),
    );
    let _ = unreachable
        .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(()) })
        .await;
    assert_metric_has_labels(
        "beacon_rpc_resolve_total",
        &[("role", "indexcoord"), ("outcome", "unavailable")],
    );

    let connector = TestConnector::new();
    connector.refuse("10.0.0.1:31000");
    let refused = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector,
        retry(1).name("metrics_refused").build(),
    );
    let _ = refused
        .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(()) })
        .await;
    assert_counter_exists("beacon_rpc_connect_failures_total");
    assert_metric_has_labels("beacon_rpc_connect_failures_total", &[("role", "indexcoord")]);

    let rejecting = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        TestConnector::new(),
        retry(3).name("metrics_rejected").build(),
    );
    let _ = rejecting
        .invoke(&CancellationToken::new(), |_| async {
            Err::<(), _>(Status::InvalidArgument)
        })
        .await;
    assert_metric_has_labels(
        "beacon_rpc_calls_total",
        &[("client", "metrics_rejected"), ("outcome", "rejected")],
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let _ = rejecting
        .invoke(&cancel, |_| async { Ok::<_, Status>(()) })
        .await;
    assert_metric_has_labels(
        "beacon_rpc_calls_total",
        &[("client", "metrics_rejected"), ("outcome", "cancelled")],
    );
}

#[tokio::test(start_paused = true)]
#[serial]
async fn keep_alive_failure_metrics() {
    init_recorder();

    let connector = TestConnector::new();
    let client = Client::open(
        ROLE,
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        stub as StubFn,
        ConnectionConfig::builder()
            .keep_alive_time(Duration::from_secs(1))
            .build(),
        retry(1).build(),
    );
    client
        .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(()) })
        .await
        .unwrap();

    connector.set_healthy(false);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_counter_exists("beacon_rpc_keepalive_failures_total");
    assert_metric_has_labels("beacon_rpc_keepalive_failures_total", &[("role", ROLE)]);
}

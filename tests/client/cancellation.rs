use crate::common::{memory_registry, open, retry, ScriptedRegistry, Status, TestConnector};
use beacon_rpc::{CancellationToken, ClientError, ConnectionState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn cancelled_before_first_attempt_does_nothing() {
    let registry = Arc::new(ScriptedRegistry::new(memory_registry(&[(
        "1",
        "10.0.0.1:31000",
    )])));
    let connector = TestConnector::new();
    let client = open(Arc::clone(&registry), connector.clone(), retry(5).build());
    let calls = AtomicUsize::new(0);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .invoke(&cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Status>(()) }
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(registry.queries(), 0);
    assert_eq!(connector.dial_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_in_flight_call() {
    let client = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        TestConnector::new(),
        retry(5).build(),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = client
        .invoke(&cancel, |_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, Status>(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn cancellation_cuts_backoff_short() {
    let cancelled_after = Arc::new(AtomicUsize::new(0));
    let recorded = Arc::clone(&cancelled_after);
    let client = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        TestConnector::new(),
        retry(5)
            .fixed_backoff(Duration::from_secs(60))
            .on_cancelled(move |attempts| recorded.store(attempts, Ordering::SeqCst))
            .build(),
    );
    let calls = AtomicUsize::new(0);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = client
        .invoke(&cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Status::Unavailable) }
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cancelled_after.load(Ordering::SeqCst), 1);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(60), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn cancellation_does_not_affect_other_calls() {
    let client = Arc::new(open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        TestConnector::new(),
        retry(5).build(),
    ));
    let cancelled = CancellationToken::new();
    cancelled.cancel();

    let err = client
        .invoke(&cancelled, |_| async { Ok::<_, Status>(1) })
        .await
        .unwrap_err();
    assert!(err.is_cancelled());

    let ok = client
        .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(2) })
        .await
        .unwrap();
    assert_eq!(ok, 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_dial_leaves_client_disconnected() {
    let connector = TestConnector::new().with_dial_delay(Duration::from_secs(5));
    let client = open(
        Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
        connector.clone(),
        retry(5).build(),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client
        .invoke(&cancel, |_| async { Ok::<_, Status>(()) })
        .await
        .unwrap_err();
    assert!(err.is_cancelled());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(connector.dial_count(), 0);

    connector.clone().with_dial_delay(Duration::ZERO);
    client
        .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(()) })
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
}

//! Property tests for the client's retry loop.
//!
//! Invariants tested:
//! - Never exceeds max_attempts
//! - Stops at the first success
//! - Terminal errors are never retried
//! - A role that never registers exhausts after exactly max_attempts lookups

use crate::common::{memory_registry, open, retry, ScriptedRegistry, Status, TestConnector};
use beacon_rpc::{CancellationToken, ClientError, MemoryRegistry, TransportError};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

fn paused_runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: Transient failures never exceed max_attempts calls
    #[test]
    fn retry_respects_max_attempts(max_attempts in 1usize..=10) {
        let rt = paused_runtime();
        rt.block_on(async {
            let client = open(
                Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
                TestConnector::new(),
                retry(max_attempts).build(),
            );
            let calls = AtomicUsize::new(0);

            let result = client
                .invoke(&CancellationToken::new(), |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(Status::Unavailable) }
                })
                .await;

            match result {
                Err(ClientError::RetriesExhausted { attempts, .. }) => {
                    prop_assert_eq!(attempts, max_attempts)
                }
                other => prop_assert!(false, "expected RetriesExhausted, got {:?}", other),
            }
            prop_assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
            Ok(())
        })?;
    }

    /// Property: Success on attempt N stops retrying
    #[test]
    fn retry_stops_on_success(
        max_attempts in 2usize..=10,
        succeed_on in 1usize..=10,
    ) {
        if succeed_on > max_attempts {
            return Ok(());
        }

        let rt = paused_runtime();
        rt.block_on(async {
            let client = open(
                Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
                TestConnector::new(),
                retry(max_attempts).build(),
            );
            let calls = AtomicUsize::new(0);

            let result = client
                .invoke(&CancellationToken::new(), |_| {
                    let count = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if count >= succeed_on {
                            Ok(count)
                        } else {
                            Err(Status::Unavailable)
                        }
                    }
                })
                .await;

            prop_assert_eq!(result.ok(), Some(succeed_on));
            prop_assert_eq!(calls.load(Ordering::SeqCst), succeed_on);
            Ok(())
        })?;
    }

    /// Property: Terminal errors are returned after exactly one call
    #[test]
    fn terminal_error_is_never_retried(max_attempts in 1usize..=10) {
        let rt = paused_runtime();
        rt.block_on(async {
            let client = open(
                Arc::new(memory_registry(&[("1", "10.0.0.1:31000")])),
                TestConnector::new(),
                retry(max_attempts).build(),
            );
            let calls = AtomicUsize::new(0);

            let result = client
                .invoke(&CancellationToken::new(), |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(Status::InvalidArgument) }
                })
                .await;

            prop_assert!(matches!(result, Err(ClientError::RemoteRejected(_))));
            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            Ok(())
        })?;
    }

    /// Property: An unregistered role is looked up exactly max_attempts times
    #[test]
    fn unregistered_role_exhausts_lookups(max_attempts in 1usize..=10) {
        let rt = paused_runtime();
        rt.block_on(async {
            let registry = Arc::new(ScriptedRegistry::new(MemoryRegistry::new()));
            let client = open(Arc::clone(&registry), TestConnector::new(), retry(max_attempts).build());

            let err = client
                .invoke(&CancellationToken::new(), |_| async { Ok::<_, Status>(()) })
                .await
                .unwrap_err();

            prop_assert!(matches!(
                err.transport_error(),
                Some(TransportError::NoAvailableInstance { .. })
            ), "expected NoAvailableInstance transport error");
            prop_assert_eq!(registry.queries(), max_attempts);
            Ok(())
        })?;
    }
}

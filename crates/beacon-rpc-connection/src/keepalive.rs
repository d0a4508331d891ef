//! Background liveness probing of a live connection.

use crate::config::ConnectionConfig;
use crate::connector::Connection;
use crate::events::ConnectionEvent;
use beacon_rpc_core::ConnectionHealth;
use beacon_rpc_discovery::Role;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Spawns the probe loop for one connection.
///
/// The loop marks the connection broken on the first failed or timed out
/// probe and exits; it never closes the connection. It also exits once
/// something else marked the connection broken. Returns `None` when probing
/// is disabled. A zero `keep_alive_timeout` waits for each reply unbounded.
pub(crate) fn spawn<C: Connection>(
    role: Role,
    address: String,
    connection: Arc<C>,
    health: ConnectionHealth,
    config: Arc<ConnectionConfig>,
) -> Option<JoinHandle<()>> {
    let period = config.keep_alive_time;
    if period.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if health.is_broken() {
                return;
            }

            let outcome = if config.keep_alive_timeout.is_zero() {
                Ok(connection.probe().await)
            } else {
                tokio::time::timeout(config.keep_alive_timeout, connection.probe()).await
            };

            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error.to_string(),
                Err(_) => format!("no reply within {:?}", config.keep_alive_timeout),
            };

            health.mark_broken();

            #[cfg(feature = "tracing")]
            tracing::warn!(role = %role, address = %address, error = %failure, "keep-alive probe failed");

            #[cfg(feature = "metrics")]
            counter!("beacon_rpc_keepalive_failures_total", "role" => role.to_string()).increment(1);

            #[cfg(not(feature = "tracing"))]
            let _ = failure;

            config.event_listeners.emit(&ConnectionEvent::KeepAliveFailed {
                role: role.to_string(),
                timestamp: Instant::now(),
                address,
            });
            return;
        }
    }))
}

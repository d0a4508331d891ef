//! The retry loop around a single logical call.

use crate::config::RetryConfig;
use crate::events::RetryEvent;
use beacon_rpc_core::{ClientError, StubProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// Outcome of one failed attempt.
enum Failure<E> {
    Retryable {
        error: ClientError<E>,
        address: Option<String>,
    },
    Terminal(ClientError<E>),
}

/// Runs a remote call against a [`StubProvider`], retrying failed attempts
/// with backoff until one succeeds, a terminal error occurs, the attempt
/// budget is spent, or the caller cancels.
///
/// Each attempt checks out a fresh stub, so a failover that happened between
/// attempts is picked up automatically.
pub struct RetryExecutor<P, E> {
    provider: P,
    config: Arc<RetryConfig<E>>,
}

impl<P: Clone, E> Clone for RetryExecutor<P, E> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<P, E> std::fmt::Debug for RetryExecutor<P, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P, E> RetryExecutor<P, E>
where
    P: StubProvider,
{
    /// Creates an executor.
    pub fn new(provider: P, config: RetryConfig<E>) -> Self {
        Self {
            provider,
            config: Arc::new(config),
        }
    }

    /// The stub provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The retry configuration.
    pub fn config(&self) -> &RetryConfig<E> {
        &self.config
    }

    /// Invokes `call` with a stub until it succeeds or the call is given up.
    ///
    /// - Transport failures are retried, except
    ///   [`TransportError::Closed`](beacon_rpc_core::TransportError::Closed).
    /// - Call errors the retry predicate accepts invalidate the connection and
    ///   are retried; all other call errors are returned as
    ///   [`ClientError::RemoteRejected`] right away.
    /// - When every attempt failed, [`ClientError::RetriesExhausted`] carries
    ///   the last error.
    /// - `cancel` is honoured before each attempt, during an attempt and during
    ///   backoff, and yields [`ClientError::Cancelled`].
    pub async fn invoke<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, ClientError<E>>
    where
        F: FnMut(P::Stub) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let policy = &self.config.policy;
        let max_attempts = policy.max_attempts();
        let mut attempts = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempts));
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempts)),
                outcome = self.attempt(&mut call) => outcome,
            };
            attempts += 1;

            let (error, address) = match outcome {
                Ok(response) => {
                    self.succeeded(attempts);
                    return Ok(response);
                }
                Err(Failure::Terminal(error)) => {
                    self.rejected(attempts);
                    return Err(error);
                }
                Err(Failure::Retryable { error, address }) => (error, address),
            };

            if attempts >= max_attempts {
                self.exhausted(attempts);
                return Err(ClientError::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                });
            }

            let delay = policy.backoff_after(attempts);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                client = %self.config.name,
                attempt = attempts,
                max_attempts,
                address = address.as_deref().unwrap_or("<unresolved>"),
                reason = failure_reason(&error),
                delay_ms = delay.as_millis() as u64,
                "attempt failed, retrying"
            );

            #[cfg(feature = "metrics")]
            {
                counter!("beacon_rpc_retries_total", "client" => self.config.name.clone()).increment(1);
                histogram!("beacon_rpc_backoff_seconds", "client" => self.config.name.clone())
                    .record(delay.as_secs_f64());
            }

            self.config.event_listeners.emit(&RetryEvent::Retry {
                role: self.config.name.clone(),
                timestamp: Instant::now(),
                attempt: attempts,
                delay,
                address,
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempts)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt<T, F, Fut>(&self, call: &mut F) -> Result<T, Failure<E>>
    where
        F: FnMut(P::Stub) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let checkout = match self.provider.checkout().await {
            Ok(checkout) => checkout,
            Err(error) => {
                return Err(if error.is_retryable() {
                    Failure::Retryable {
                        error: ClientError::Transport(error),
                        address: None,
                    }
                } else {
                    Failure::Terminal(ClientError::Transport(error))
                });
            }
        };

        let address = checkout.address().to_string();
        let (stub, health) = checkout.into_parts();

        match call(stub).await {
            Ok(response) => Ok(response),
            Err(error) if self.config.policy.is_transient(&error) => {
                health.mark_broken();
                Err(Failure::Retryable {
                    error: ClientError::CallFailed(error),
                    address: Some(address),
                })
            }
            Err(error) => Err(Failure::Terminal(ClientError::RemoteRejected(error))),
        }
    }

    fn succeeded(&self, attempts: usize) {
        #[cfg(feature = "tracing")]
        {
            if attempts > 1 {
                tracing::debug!(client = %self.config.name, attempts, "call succeeded after retries");
            }
        }

        #[cfg(feature = "metrics")]
        counter!("beacon_rpc_calls_total", "client" => self.config.name.clone(), "outcome" => "success")
            .increment(1);

        self.config.event_listeners.emit(&RetryEvent::Success {
            role: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });
    }

    fn rejected(&self, attempt: usize) {
        #[cfg(feature = "tracing")]
        tracing::debug!(client = %self.config.name, attempt, "call failed with terminal error");

        #[cfg(feature = "metrics")]
        counter!("beacon_rpc_calls_total", "client" => self.config.name.clone(), "outcome" => "rejected")
            .increment(1);

        self.config.event_listeners.emit(&RetryEvent::Rejected {
            role: self.config.name.clone(),
            timestamp: Instant::now(),
            attempt,
        });
    }

    fn exhausted(&self, attempts: usize) {
        #[cfg(feature = "tracing")]
        tracing::warn!(client = %self.config.name, attempts, "retries exhausted");

        #[cfg(feature = "metrics")]
        counter!("beacon_rpc_calls_total", "client" => self.config.name.clone(), "outcome" => "exhausted")
            .increment(1);

        self.config.event_listeners.emit(&RetryEvent::Exhausted {
            role: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });
    }

    fn cancelled(&self, attempts: usize) -> ClientError<E> {
        #[cfg(feature = "tracing")]
        tracing::debug!(client = %self.config.name, attempts, "call cancelled");

        #[cfg(feature = "metrics")]
        counter!("beacon_rpc_calls_total", "client" => self.config.name.clone(), "outcome" => "cancelled")
            .increment(1);

        self.config.event_listeners.emit(&RetryEvent::Cancelled {
            role: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });
        ClientError::Cancelled
    }
}

#[cfg(feature = "tracing")]
fn failure_reason<E>(error: &ClientError<E>) -> &'static str {
    use beacon_rpc_core::TransportError;

    match error {
        ClientError::Transport(TransportError::NoAvailableInstance { .. }) => "no_instance",
        ClientError::Transport(TransportError::DiscoveryUnavailable { .. }) => "discovery",
        ClientError::Transport(TransportError::ConnectFailed { .. }) => "connect",
        ClientError::Transport(TransportError::Closed) => "closed",
        ClientError::CallFailed(_) => "call",
        _ => "other",
    }
}

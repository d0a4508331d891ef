use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::events::RetryEvent;
use crate::policy::{RetryPolicy, RetryPredicate};
use beacon_rpc_core::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Default total attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;
/// Default delay after the first failed attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(200);
/// Default upper bound on any single delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Default growth factor between delays.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Configuration for [`RetryExecutor`](crate::RetryExecutor).
pub struct RetryConfig<E> {
    pub(crate) policy: RetryPolicy<E>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    /// Creates a new builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "beacon_rpc_calls_total",
                    "Total number of invoke calls by final outcome"
                );
                describe_counter!(
                    "beacon_rpc_retries_total",
                    "Total number of retries scheduled after a failed attempt"
                );
                describe_histogram!(
                    "beacon_rpc_backoff_seconds",
                    "Delay slept before a retry"
                );
            });
        }

        RetryConfigBuilder::new()
    }

    /// The retry policy.
    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// The name used in events, logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<E> Default for RetryConfig<E> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<E> std::fmt::Debug for RetryConfig<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    backoff_multiplier: f64,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    retry_predicate: Option<RetryPredicate<E>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 10
    /// - backoff: exponential, 200ms initial, x2.0, capped at 10s
    /// - retry predicate: none (remote call errors are terminal)
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            interval_fn: None,
            retry_predicate: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the total number of attempts, including the first.
    ///
    /// Zero is treated as one: a call is always attempted at least once.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay after the first failed attempt.
    pub fn initial_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Caps every delay, including the first.
    pub fn max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Sets the growth factor between consecutive delays.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets all three exponential backoff parameters at once.
    pub fn exponential_backoff(mut self, initial: Duration, multiplier: f64, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.backoff_multiplier = multiplier;
        self.max_backoff = max;
        self.interval_fn = None;
        self
    }

    /// Uses the same delay before every retry.
    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(duration)));
        self
    }

    /// Uses a custom interval function instead of the exponential defaults.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Marks remote call errors matching `predicate` as transient.
    ///
    /// A transient error invalidates the connection it happened on and the
    /// call is retried; any other call error is returned immediately as
    /// [`ClientError::RemoteRejected`](beacon_rpc_core::ClientError::RemoteRejected).
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the name used in events, logs and metric labels.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a retry is scheduled.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)`: the attempt that just failed (1-indexed) and the
    /// delay before the next one.
    ///
    /// # Example
    /// ```rust
    /// use beacon_rpc_retry::RetryConfig;
    /// use std::time::Duration;
    ///
    /// let config = RetryConfig::<std::io::Error>::builder()
    ///     .max_attempts(5)
    ///     .on_retry(|attempt, delay| {
    ///         println!("attempt {} failed, retrying in {:?}", attempt, delay);
    ///     })
    ///     .build();
    /// # let _ = config;
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback when a call succeeds, with the number of attempts it took.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when every attempt has failed.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when a call fails with a terminal error.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Rejected { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a callback when a call is cancelled by the caller.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Cancelled { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RetryConfig<E> {
        let interval_fn = self.interval_fn.unwrap_or_else(|| {
            Arc::new(
                ExponentialBackoff::new(self.initial_backoff)
                    .multiplier(self.backoff_multiplier)
                    .max_interval(self.max_backoff),
            )
        });

        let mut policy = RetryPolicy::new(self.max_attempts, interval_fn);
        policy.retry_predicate = self.retry_predicate;

        RetryConfig {
            policy,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

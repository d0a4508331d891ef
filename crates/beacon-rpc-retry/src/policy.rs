use crate::backoff::IntervalFunction;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a call error is transient.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How many attempts to make and how long to wait between them.
///
/// Call errors are terminal unless a predicate says otherwise: a remote
/// service rejecting a request is not retried by default. Transport failures
/// are classified by the executor, not by this policy.
pub struct RetryPolicy<E> {
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Creates a policy. `max_attempts` is raised to at least 1.
    pub fn new(max_attempts: usize, interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval_fn,
            retry_predicate: None,
        }
    }

    /// Total attempts, including the first one.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns `true` if `error` from the remote call should be retried.
    pub fn is_transient(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => false,
        }
    }

    /// Delay after the given failed attempt (1-indexed).
    pub fn backoff_after(&self, attempt: usize) -> Duration {
        self.interval_fn.next_interval(attempt.saturating_sub(1))
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            interval_fn: Arc::clone(&self.interval_fn),
            retry_predicate: self.retry_predicate.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("has_predicate", &self.retry_predicate.is_some())
            .finish()
    }
}

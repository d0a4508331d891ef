use beacon_rpc_core::ClientEvent;
use std::time::{Duration, Instant};

/// Events emitted while a call is being retried.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed with a retryable error and another one is scheduled.
    Retry {
        role: String,
        timestamp: Instant,
        /// The attempt that just failed (1-indexed).
        attempt: usize,
        /// Delay before the next attempt.
        delay: Duration,
        /// Address the failed attempt used, if a stub was obtained.
        address: Option<String>,
    },
    /// The call succeeded.
    Success {
        role: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Every attempt failed with a retryable error.
    Exhausted {
        role: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The call failed with a terminal error and was not retried.
    Rejected {
        role: String,
        timestamp: Instant,
        attempt: usize,
    },
    /// The caller's cancellation signal stopped the call.
    Cancelled {
        role: String,
        timestamp: Instant,
        /// Attempts completed before cancellation was observed.
        attempts: usize,
    },
}

impl ClientEvent for RetryEvent {
    fn kind(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "Retry",
            RetryEvent::Success { .. } => "Success",
            RetryEvent::Exhausted { .. } => "Exhausted",
            RetryEvent::Rejected { .. } => "Rejected",
            RetryEvent::Cancelled { .. } => "Cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::Rejected { timestamp, .. }
            | RetryEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    fn role(&self) -> &str {
        match self {
            RetryEvent::Retry { role, .. }
            | RetryEvent::Success { role, .. }
            | RetryEvent::Exhausted { role, .. }
            | RetryEvent::Rejected { role, .. }
            | RetryEvent::Cancelled { role, .. } => role,
        }
    }

    fn address(&self) -> Option<&str> {
        match self {
            RetryEvent::Retry { address, .. } => address.as_deref(),
            _ => None,
        }
    }
}

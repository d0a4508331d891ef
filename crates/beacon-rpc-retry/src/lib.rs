//! Bounded retries with backoff for discovery-backed remote calls.
//!
//! [`RetryExecutor`] drives one logical call: it checks out a stub from a
//! [`StubProvider`](beacon_rpc_core::StubProvider), runs the caller's closure,
//! classifies the failure and either returns, or sleeps and tries again. The
//! caller's [`CancellationToken`](tokio_util::sync::CancellationToken) aborts
//! the whole sequence at any point.
//!
//! # Classification
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | transport failure (no instance, registry down, dial failed) | retried |
//! | client closed | returned immediately |
//! | call error accepted by `retry_on` | connection invalidated, retried |
//! | any other call error | returned immediately as `RemoteRejected` |
//!
//! # Examples
//!
//! ```rust
//! use beacon_rpc_retry::RetryConfig;
//! use std::time::Duration;
//!
//! let config = RetryConfig::<std::io::Error>::builder()
//!     .max_attempts(5)
//!     .exponential_backoff(Duration::from_millis(100), 2.0, Duration::from_secs(5))
//!     .retry_on(|e| e.kind() == std::io::ErrorKind::ConnectionReset)
//!     .name("indexcoord")
//!     .build();
//! assert_eq!(config.policy().max_attempts(), 5);
//! ```
//!
//! # Backoff Strategies
//!
//! - [`ExponentialBackoff`]: `initial * multiplier^n`, capped (the default)
//! - [`ExponentialRandomBackoff`]: exponential with jitter
//! - [`FixedInterval`]: constant delay
//! - [`FnInterval`]: any closure

mod backoff;
mod config;
mod events;
mod executor;
mod policy;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{
    RetryConfig, RetryConfigBuilder, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
};
pub use events::RetryEvent;
pub use executor::RetryExecutor;
pub use policy::{RetryPolicy, RetryPredicate};

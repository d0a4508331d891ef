//! Backoff strategies between attempts.

use std::time::Duration;

/// Computes the delay before a retry.
pub trait IntervalFunction: Send + Sync {
    /// Returns the delay before retry number `retry` (0-indexed, so the sleep
    /// after the first failed attempt is `next_interval(0)`).
    fn next_interval(&self, retry: usize) -> Duration;
}

/// Converts seconds to a `Duration`, saturating instead of panicking on
/// overflow or non-finite input.
fn saturating_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Same delay before every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    /// Creates a fixed interval backoff.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _retry: usize) -> Duration {
        self.duration
    }
}

/// Geometric backoff: `min(initial * multiplier^retry, max_interval)`.
///
/// With `initial = 10ms`, `multiplier = 2` and `max_interval = 100ms` the
/// delays are 10ms, 20ms, 40ms, 80ms, 100ms, 100ms, ...
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff with a multiplier of 2.0 and no cap.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the growth factor. Values below 1.0 are raised to 1.0 so delays
    /// never shrink.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        self
    }

    /// Caps every delay at `max_interval`.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    fn uncapped_secs(&self, retry: usize) -> f64 {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent)
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        let interval = saturating_secs(self.uncapped_secs(retry));
        match self.max_interval {
            Some(max) => interval.min(max),
            None => interval,
        }
    }
}

/// Exponential backoff with jitter, for many clients failing over together.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// Creates a randomized exponential backoff.
    ///
    /// A `randomization_factor` of 0.5 spreads each delay uniformly between 50%
    /// and 150% of the exponential value. The factor is clamped to `[0, 1]`.
    pub fn new(initial_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            base: ExponentialBackoff::new(initial_interval),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }

    /// Sets the growth factor.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.base = self.base.multiplier(multiplier);
        self
    }

    /// Caps the delay before randomization.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.base = self.base.max_interval(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        use rand::Rng;

        let secs = self.base.next_interval(retry).as_secs_f64();
        let delta = secs * self.randomization_factor;
        if delta <= 0.0 {
            return saturating_secs(secs);
        }
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));
        saturating_secs(jittered)
    }
}

/// Closure-backed interval.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Creates a function-based interval.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, retry: usize) -> Duration {
        (self.f)(retry)
    }
}

impl<F> std::fmt::Debug for FnInterval<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnInterval").finish_non_exhaustive()
    }
}

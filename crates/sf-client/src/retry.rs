//! Transport-level retry with exponential backoff and jitter.
//!
//! Only the HTTP layer retries. Collection batches and query pages are never
//! re-submitted by the callers above it.

use rand::Rng;
use std::time::Duration;

use crate::request::RequestMethod;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for computed delays.
    pub max_delay: Duration,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Honour `Retry-After` on 429 responses.
    pub respect_retry_after: bool,
    /// Cap applied to `Retry-After`.
    pub max_retry_after: Duration,
    /// Also retry POST and PATCH. A retried collection insert can create
    /// duplicates, so this is off by default.
    pub retry_non_idempotent: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff: BackoffStrategy::ExponentialWithJitter { factor: 2.0 },
            respect_retry_after: true,
            max_retry_after: Duration::from_secs(60),
            retry_non_idempotent: false,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of retries.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Allow POST and PATCH requests to be retried.
    pub fn with_non_idempotent_retries(mut self, enabled: bool) -> Self {
        self.retry_non_idempotent = enabled;
        self
    }

    /// Whether a request with this method may be re-sent at all.
    pub fn allows(&self, method: RequestMethod) -> bool {
        self.retry_non_idempotent || method.is_idempotent()
    }

    /// Delay before retry number `attempt` (0-based), or `None` once the
    /// budget is spent.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match retry_after {
            Some(wait) if self.respect_retry_after => Some(wait.min(self.max_retry_after)),
            _ => Some(
                self.backoff
                    .delay(attempt, self.initial_delay)
                    .min(self.max_delay),
            ),
        }
    }
}

/// Backoff strategy for determining retry delays.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Same delay every time.
    Constant,
    /// `initial * factor^attempt`.
    Exponential { factor: f64 },
    /// Exponential plus a random share of the same amount.
    ExponentialWithJitter { factor: f64 },
}

impl BackoffStrategy {
    fn delay(&self, attempt: u32, initial: Duration) -> Duration {
        let base = |factor: f64| initial.as_secs_f64() * factor.powi(attempt as i32);
        match *self {
            BackoffStrategy::Constant => initial,
            BackoffStrategy::Exponential { factor } => Duration::from_secs_f64(base(factor)),
            BackoffStrategy::ExponentialWithJitter { factor } => {
                let base = base(factor);
                let jitter = rand::rng().random::<f64>() * base;
                Duration::from_secs_f64(base + jitter)
            }
        }
    }
}

//! Exponential backoff with jitter.

use crate::core::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Lower bound of the jitter fraction added to each delay.
pub const JITTER_MIN: f64 = 0.1;
/// Upper bound of the jitter fraction added to each delay.
pub const JITTER_MAX: f64 = 0.3;

/// Which faults are worth another attempt.
#[derive(Clone, Copy, Default)]
pub enum RetryOn {
    /// Every error
    #[default]
    Any,
    /// Network faults and 5xx agent faults only
    Transient,
    /// Caller-supplied classifier
    Custom(fn(&Error) -> bool),
}

impl RetryOn {
    /// Whether `err` should be retried.
    pub fn should_retry(&self, err: &Error) -> bool {
        match self {
            RetryOn::Any => true,
            RetryOn::Transient => err.is_transient(),
            RetryOn::Custom(classify) => classify(err),
        }
    }
}

impl std::fmt::Debug for RetryOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryOn::Any => write!(f, "Any"),
            RetryOn::Transient => write!(f, "Transient"),
            RetryOn::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Retry policy for fallible async operations.
///
/// Delay before attempt `k + 1` is
/// `min(max_delay, initial_delay * backoff_factor^k * (1 + jitter))`
/// with `jitter` drawn from `[0.1, 0.3]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure (ms)
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay (ms)
    pub max_delay_ms: u64,
    /// Multiplier applied per attempt
    pub backoff_factor: f64,
    /// Fault classification
    #[serde(skip)]
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            retry_on: RetryOn::Any,
        }
    }
}

impl RetryPolicy {
    /// Policy with a given attempt budget and default timings.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the first delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Narrow or widen the retried fault classes.
    pub fn retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Check the policy values.
    pub fn validate(&self) -> Result<()> {
        if self.backoff_factor < 1.0 {
            return Err(Error::Config("backoff factor must be at least 1.0".into()));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::Config(
                "initial delay must not exceed max delay".into(),
            ));
        }
        Ok(())
    }

    /// Effective attempt budget; zero behaves as a single attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt `attempt` (0-based) for a given jitter
    /// fraction.
    pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_factor.powi(attempt as i32);
        let delay = (base * (1.0 + jitter)).min(self.max_delay_ms as f64);
        Duration::from_millis(delay.max(0.0) as u64)
    }

    /// Delay after failed attempt `attempt` with freshly sampled jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
        self.delay_with_jitter(attempt, jitter)
    }

    /// Run `op` until it succeeds, hits a non-retryable fault, or the
    /// attempt budget is spent. The last fault is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts();
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempt = attempt + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if !self.retry_on.should_retry(&err) {
                        debug!(operation, error = %err, "fault not retryable");
                        return Err(err);
                    }
                    if attempt + 1 >= attempts {
                        warn!(operation, attempts, error = %err, "retries exhausted");
                        return Err(err);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

//! Retry with exponential backoff for classification calls.
//!
//! Off by default: one receipt gets one request. Enabling retries only
//! affects the HTTP client, never the extractor's parse step.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Randomize each delay by up to ±25%.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (1-indexed; 0 yields no delay).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        let delay_ms = exponential.min(self.max_delay_ms as f64) as u64;

        if self.jitter {
            let spread = delay_ms / 4;
            if spread > 0 {
                let offset = fastrand::u64(0..spread * 2);
                return Duration::from_millis(delay_ms - spread + offset);
            }
        }
        Duration::from_millis(delay_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("base_delay_ms must not exceed max_delay_ms".into());
        }
        Ok(())
    }
}

/// Outcome of [`retry_async`].
#[derive(Debug)]
pub struct RetryResult<T, E> {
    pub result: Result<T, E>,
    /// Attempts made; 1 means the first try decided the outcome.
    pub attempts: u32,
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. The last error is returned as is.
pub async fn retry_async<T, E, F, Fut, R>(
    config: &RetryConfig,
    is_retryable: R,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        let result = operation(attempt).await;
        let done = match &result {
            Ok(_) => true,
            Err(err) => attempt >= config.max_retries || !is_retryable(err),
        };
        if done {
            return RetryResult {
                result,
                attempts: attempt + 1,
                total_duration: start.elapsed(),
            };
        }

        attempt += 1;
        let delay = config.calculate_delay(attempt);
        if let Err(err) = &result {
            warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying_classification");
        }
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

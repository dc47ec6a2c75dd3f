//! Retry policy (C15), grounded on `hadrian`'s `providers::retry` module:
//! exponential backoff with jitter, a `Retry-After`-aware override, and a
//! retryable-status-code allowlist.

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            retryable_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// `min(maxDelay, initialDelay * multiplier^attempt)` with ±20% jitter,
    /// per spec.md §4.15. `retry_after` — when the provider sent one —
    /// supersedes the computed delay entirely.
    pub fn delay_for_attempt(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(d) = retry_after {
            return d;
        }
        let base = (self.initial_delay_ms as f64) * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);
        let jitter_fraction = rand::thread_rng().gen_range(-0.2..=0.2);
        let jittered = (capped * (1.0 + jitter_fraction)).max(0.0);
        Duration::from_millis(jittered as u64)
    }
}

/// Executes `operation` with retry, honoring an optional `Retry-After`
/// reported by the failing call (e.g. a 429 from a downstream provider).
/// `should_retry` classifies whether a given error is worth retrying.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: impl Fn(&E) -> Option<Option<Duration>>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retry_after = match should_retry(&err) {
                    Some(retry_after) => retry_after,
                    None => return Err(err),
                };
                if attempt + 1 >= config.max_attempts {
                    tracing::warn!(operation = operation_name, attempt, "retries exhausted");
                    return Err(err);
                }
                let delay = config.delay_for_attempt(attempt, retry_after);
                tracing::debug!(operation = operation_name, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

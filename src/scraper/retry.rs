//! Retry with bounded backoff for transport calls
//!
//! | Outcome | Action |
//! |---------|--------|
//! | 2xx | Return the body |
//! | 429 | Wait `Retry-After` (or the default wait), retry |
//! | 5xx / network error | Wait `base * attempt`, retry |
//! | other status | Fail immediately |
//!
//! Every non-fatal outcome consumes one attempt from the same budget, so a
//! logical operation makes at most `max_retries` requests. Every wait is
//! capped at `max_backoff`.

use crate::config::ScraperConfig;
use crate::scraper::transport::TransportOutcome;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a request could not produce a usable response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("HTTP {status} is not retryable")]
    ClientError { status: u16 },

    #[error("gave up after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FailureReason {
    /// Returns true if the same request might succeed in a later run
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}

/// Retry limits and waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per logical operation
    pub max_retries: u32,

    /// Base wait after a server or network error
    pub base_backoff: Duration,

    /// Upper bound on any single wait
    pub max_backoff: Duration,

    /// Wait used when a 429 carries no usable `Retry-After`
    pub rate_limit_wait: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: config.retry_backoff(),
            max_backoff: config.max_backoff(),
            rate_limit_wait: config.rate_limit_wait(),
        }
    }

    /// Wait after a server or network error on `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(attempt)
            .min(self.max_backoff)
    }

    /// Wait after a 429 response
    pub fn rate_limit_delay(&self, retry_after: Option<Duration>) -> Duration {
        retry_after
            .unwrap_or(self.rate_limit_wait)
            .min(self.max_backoff)
    }

    /// Wait before retrying `outcome`, or `None` if it must not be retried
    fn delay_for(&self, outcome: &TransportOutcome, attempt: u32) -> Option<Duration> {
        if !outcome.is_retryable() {
            return None;
        }
        match outcome {
            TransportOutcome::RateLimited { retry_after } => {
                Some(self.rate_limit_delay(*retry_after))
            }
            _ => Some(self.backoff_for(attempt)),
        }
    }

    /// Runs `operation` until it succeeds, fails fatally, or the attempt
    /// budget is spent
    ///
    /// # Arguments
    ///
    /// * `label` - Short description used in log lines
    /// * `operation` - Performs one transport call per invocation
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Body of the first successful response
    /// * `Err(FailureReason)` - Client error or exhausted retries
    pub async fn call_with_retry<F, Fut>(
        &self,
        label: &str,
        mut operation: F,
    ) -> Result<String, FailureReason>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransportOutcome>,
    {
        let max_retries = self.max_retries.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcome = operation().await;

            let wait = match &outcome {
                TransportOutcome::Ok { body } => return Ok(body.clone()),
                TransportOutcome::ClientError { status } => {
                    tracing::error!(label, status, "Request failed with non-retryable status");
                    return Err(FailureReason::ClientError { status: *status });
                }
                retryable => self.delay_for(retryable, attempt).unwrap_or(Duration::ZERO),
            };

            if attempt >= max_retries {
                tracing::error!(
                    label,
                    attempts = attempt,
                    last = %outcome,
                    "Giving up after exhausting retries"
                );
                return Err(FailureReason::RetriesExhausted {
                    attempts: attempt,
                    last: outcome.to_string(),
                });
            }

            tracing::warn!(
                label,
                attempt,
                max_retries,
                wait_ms = wait.as_millis() as u64,
                "{}, retrying",
                outcome
            );
            tokio::time::sleep(wait).await;
        }
    }
}

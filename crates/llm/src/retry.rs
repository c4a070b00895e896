//! Bounded retry with exponential backoff for provider HTTP calls.
//!
//! Each provider classifies a failed attempt as retryable (transport errors,
//! HTTP 429, HTTP 5xx) or fatal (other statuses, undecodable bodies). Only
//! retryable failures are attempted again, at most `max_retries` times.

use std::future::Future;
use std::time::Duration;

/// Initial backoff before the first retry.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Outcome of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Worth trying again
    Retryable(String),
    /// Give up immediately
    Fatal(String),
}

impl AttemptError {
    /// Classify an HTTP error status.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body.trim());
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            AttemptError::Retryable(message)
        } else {
            AttemptError::Fatal(message)
        }
    }

    /// Classify a transport-level failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_builder() {
            AttemptError::Fatal(err.to_string())
        } else {
            AttemptError::Retryable(err.to_string())
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AttemptError::Retryable(m) | AttemptError::Fatal(m) => m,
        }
    }
}

/// Retry policy shared by LLM and embedding providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: INITIAL_BACKOFF,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1u32 << exponent)
    }

    /// Run `attempt` until it succeeds, fails fatally, or retries run out.
    ///
    /// The returned error message carries the last failure and the number of
    /// attempts made.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut retries = 0u32;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(message)) => return Err(message),
                Err(AttemptError::Retryable(message)) => {
                    if retries >= self.max_retries {
                        return Err(format!(
                            "{} (gave up after {} attempts)",
                            message,
                            retries + 1
                        ));
                    }

                    retries += 1;
                    let backoff = self.backoff_for(retries);
                    tracing::warn!(
                        "{} failed (retry {}/{}), retrying in {}ms: {}",
                        operation,
                        retries,
                        self.max_retries,
                        backoff.as_millis(),
                        message
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

//! Retry policy: attempt budget, exponential backoff and error classification.

use std::time::Duration;

use super::error::RequestError;

/// Default number of attempts per logical request.
pub const MAX_RETRIES: usize = 3;

/// Default backoff base in milliseconds. The delay after failed attempt `n`
/// is `base * 2^(n-1)`.
pub const RETRY_DELAY_MS: u64 = 100;

/// Upper bound for a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Decides how many attempts a request gets and how long to wait between them.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff_base: Duration,
    pub retry_on_decode_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            backoff_base: Duration::from_millis(RETRY_DELAY_MS),
            retry_on_decode_error: true,
        }
    }
}

impl RetryPolicy {
    /// Delay inserted after `failed_attempt` (1-based) failed.
    pub fn backoff_after(&self, failed_attempt: usize) -> Duration {
        let exponent = failed_attempt.saturating_sub(1);
        let factor = u32::try_from(exponent)
            .ok()
            .and_then(|e| 1u32.checked_shl(e))
            .unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Whether the error may be retried under this policy.
    pub fn is_retryable(&self, error: &RequestError) -> bool {
        match error {
            RequestError::Decode(_) => self.retry_on_decode_error,
            other => other.is_transient(),
        }
    }

    /// Whether another attempt follows `attempt` after it failed with `error`.
    pub fn should_retry(&self, attempt: &RequestAttempt, error: &RequestError) -> bool {
        attempt.number < self.max_attempts && self.is_retryable(error)
    }
}

/// One attempt in the retry sequence of a single logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestAttempt {
    /// 1-based attempt number.
    pub number: usize,
    /// Backoff slept before this attempt started.
    pub delay: Duration,
    /// Failure of the attempt before this one.
    pub previous_error: Option<RequestError>,
}

impl RequestAttempt {
    pub fn first() -> Self {
        Self {
            number: 1,
            delay: Duration::ZERO,
            previous_error: None,
        }
    }

    /// The attempt that follows this one after it failed with `error`.
    pub fn next(&self, policy: &RetryPolicy, error: RequestError) -> Self {
        Self {
            number: self.number + 1,
            delay: policy.backoff_after(self.number),
            previous_error: Some(error),
        }
    }
}

//! Client configuration.

use anyhow::{Result, bail};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::http::{MAX_RETRIES, RETRY_DELAY_MS, RetryPolicy};

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Default per-attempt deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Immutable configuration of an [`ApiClient`](crate::http::ApiClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origin prepended to every request path.
    pub base_url: String,
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Total attempts per request, not additional retries.
    pub max_retries: usize,
    /// Whether successful GET responses are cached.
    pub cache_enabled: bool,
    /// First backoff delay; doubles after every failed attempt.
    pub backoff_base: Duration,
    /// Whether an undecodable body is retried like a network failure.
    pub retry_on_decode_error: bool,
    /// Cache bound. `None` keeps every entry until cleared.
    pub cache_capacity: Option<NonZeroUsize>,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub bearer_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: MAX_RETRIES,
            cache_enabled: true,
            backoff_base: Duration::from_millis(RETRY_DELAY_MS),
            retry_on_decode_error: true,
            cache_capacity: None,
            bearer_token: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_retry_on_decode_error(mut self, retry: bool) -> Self {
        self.retry_on_decode_error = retry;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: Option<NonZeroUsize>) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            bail!("Base URL must not be empty");
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!(
                "Invalid base URL: {}. Expected an http:// or https:// origin.",
                self.base_url
            );
        }
        if self.timeout.is_zero() {
            bail!("Timeout must be greater than zero");
        }
        if self.max_retries == 0 {
            bail!("max_retries counts total attempts and must be at least 1");
        }
        Ok(())
    }

    /// Joins the base URL and a request path. The path is not validated.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            backoff_base: self.backoff_base,
            retry_on_decode_error: self.retry_on_decode_error,
        }
    }

    /// Returns a copy with the given overrides applied.
    pub fn merged(&self, overrides: ConfigOverrides) -> Self {
        Self {
            base_url: overrides.base_url.unwrap_or_else(|| self.base_url.clone()),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
            cache_enabled: overrides.cache_enabled.unwrap_or(self.cache_enabled),
            backoff_base: overrides.backoff_base.unwrap_or(self.backoff_base),
            retry_on_decode_error: overrides
                .retry_on_decode_error
                .unwrap_or(self.retry_on_decode_error),
            cache_capacity: overrides.cache_capacity.unwrap_or(self.cache_capacity),
            bearer_token: overrides
                .bearer_token
                .unwrap_or_else(|| self.bearer_token.clone()),
        }
    }
}

/// Partial configuration for [`ApiClient::with_config`](crate::http::ApiClient::with_config).
/// Unset fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<usize>,
    pub cache_enabled: Option<bool>,
    pub backoff_base: Option<Duration>,
    pub retry_on_decode_error: Option<bool>,
    pub cache_capacity: Option<Option<NonZeroUsize>>,
    pub bearer_token: Option<Option<String>>,
}

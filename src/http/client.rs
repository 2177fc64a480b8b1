//! HTTP client with retry, per-attempt timeout, cancellation and a read cache.

use anyhow::Result;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::body::{Body, Method};
use super::cache::{CacheKey, ResponseCache};
use super::error::RequestError;
use super::retry::RequestAttempt;
use super::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::config::{ClientConfig, ConfigOverrides};

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Aborts the whole attempt sequence, including a pending backoff.
    pub cancel: Option<CancellationToken>,
    /// Extra headers for this call only.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Resilient request client layered over a [`Transport`].
///
/// Clones share configuration, transport and cache.
pub struct ApiClient<T: Transport> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    cache: Arc<ResponseCache>,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl ApiClient<ReqwestTransport> {
    /// Creates a client that talks to the backend over reqwest.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::build_default()?;
        Self::new(config, transport)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Result<Self> {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    pub fn with_shared_transport(config: ClientConfig, transport: Arc<T>) -> Result<Self> {
        config.validate()?;
        let cache = ResponseCache::new(config.cache_capacity);
        debug!("API client initialized: {}", config.base_url);
        Ok(Self {
            config: Arc::new(config),
            transport,
            cache: Arc::new(cache),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a new client with the overrides applied.
    ///
    /// The new client shares the transport but starts with an empty cache.
    /// This client and its in-flight requests are unaffected.
    pub fn with_config(&self, overrides: ConfigOverrides) -> Result<Self> {
        let config = self.config.merged(overrides);
        Self::with_shared_transport(config, Arc::clone(&self.transport))
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("API cache cleared");
    }

    /// Drops the cached response for one request. Returns whether one existed.
    pub fn evict_cache(&self, method: Method, path: &str) -> bool {
        self.cache.evict(&CacheKey::new(method, path))
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Body,
    ) -> Result<Value, RequestError> {
        self.request_with(method, path, body, &RequestOptions::default())
            .await
    }

    pub async fn get(&self, path: &str) -> Result<Value, RequestError> {
        self.request(Method::Get, path, Body::Empty).await
    }

    /// Issues a request, retrying transient failures with exponential backoff.
    ///
    /// GET requests without a body are served from and stored in the cache
    /// when caching is enabled. After the last attempt fails the error is
    /// wrapped in [`RequestError::ExhaustedRetries`].
    #[tracing::instrument(skip(self, body, options))]
    pub async fn request_with(
        &self,
        method: Method,
        path: &str,
        body: Body,
        options: &RequestOptions,
    ) -> Result<Value, RequestError> {
        let cache_key = (self.config.cache_enabled && method.is_cacheable() && body.is_empty())
            .then(|| CacheKey::new(method, path));

        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get(key) {
                debug!("Cache hit: {} {}", method, path);
                return Ok(cached);
            }
        }

        let request = TransportRequest {
            method,
            url: self.config.url_for(path),
            headers: self.headers_for(&body, options),
            body,
        };
        let policy = self.config.retry_policy();
        let cancel = options.cancel.as_ref();
        let mut attempt = RequestAttempt::first();

        loop {
            if !attempt.delay.is_zero() {
                backoff(attempt.delay, cancel).await?;
            }

            debug!(
                "Request: {} {} (attempt {}/{})",
                method, path, attempt.number, policy.max_attempts
            );

            let error = match self.attempt(request.clone(), cancel).await {
                Ok((value, has_body)) => {
                    if let Some(key) = cache_key.filter(|_| has_body) {
                        self.cache.insert(key, value.clone());
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !policy.is_retryable(&error) {
                debug!("{} {}: non-retryable error: {}", method, path, error);
                return Err(error);
            }

            if !policy.should_retry(&attempt, &error) {
                return Err(RequestError::ExhaustedRetries {
                    attempts: attempt.number,
                    source: Box::new(error),
                });
            }

            warn!(
                "{} {}: attempt {}/{} failed ({}), retrying in {}ms...",
                method,
                path,
                attempt.number,
                policy.max_attempts,
                error,
                policy.backoff_after(attempt.number).as_millis()
            );
            attempt = attempt.next(&policy, error);
        }
    }

    /// One bounded exchange. On timeout or cancellation the transport future
    /// is dropped, which aborts the underlying call.
    ///
    /// Returns the decoded body and whether the server sent one (false for 204).
    async fn attempt(
        &self,
        request: TransportRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<(Value, bool), RequestError> {
        let timeout = self.config.timeout;
        let exchange = tokio::time::timeout(timeout, self.transport.send(request));

        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(RequestError::Cancelled),
                outcome = exchange => outcome,
            },
            None => exchange.await,
        };

        let response = outcome.map_err(|_| RequestError::Timeout(timeout))??;

        if !response.is_success() {
            return Err(RequestError::HttpStatus {
                status: response.status,
                status_text: response.status_text,
            });
        }

        let value = response.json()?;
        Ok((value, !response.is_no_content()))
    }

    fn headers_for(&self, body: &Body, options: &RequestOptions) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];

        if let Some(token) = &self.config.bearer_token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        // multipart boundaries are set by the transport
        if matches!(body, Body::Json(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        headers.extend(options.headers.iter().cloned());
        headers
    }
}

async fn backoff(delay: Duration, cancel: Option<&CancellationToken>) -> Result<(), RequestError> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(RequestError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

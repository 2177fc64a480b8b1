//! HTTP client module with retry, caching and error handling.

mod body;
mod cache;
mod client;
mod error;
mod retry;
mod transport;

pub use body::{Body, Form, Method, Part, PartValue};
pub use cache::{CacheKey, ResponseCache};
pub use client::{ApiClient, RequestOptions};
pub use error::RequestError;
pub use retry::{MAX_BACKOFF, MAX_RETRIES, RETRY_DELAY_MS, RequestAttempt, RetryPolicy};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

#[cfg(test)]
pub use transport::MockTransport;

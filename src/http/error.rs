//! Error taxonomy for requests issued through [`ApiClient`](super::ApiClient).

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the request engine.
///
/// `Network`, `HttpStatus` and `Timeout` are transient and retried until the
/// attempt budget runs out. `Decode` is retried only when the client is
/// configured to do so. `Cancelled` and `InvalidRequest` are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// The transport failed before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {status_text}")]
    HttpStatus { status: u16, status_text: String },

    /// The per-attempt deadline elapsed.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The response body was not the expected structured data.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Every permitted attempt failed.
    #[error("failed after {attempts} {}: {source}", attempt_noun(.attempts))]
    ExhaustedRetries {
        attempts: usize,
        #[source]
        source: Box<RequestError>,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    /// Whether another attempt may succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RequestError::Network(_) | RequestError::HttpStatus { .. } | RequestError::Timeout(_)
        )
    }

    /// The status code carried by this error or the error it wraps.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::HttpStatus { status, .. } => Some(*status),
            RequestError::ExhaustedRetries { source, .. } => source.status(),
            _ => None,
        }
    }

    /// The innermost error, unwrapping an exhausted-retries wrapper.
    pub fn last_cause(&self) -> &RequestError {
        match self {
            RequestError::ExhaustedRetries { source, .. } => source.last_cause(),
            other => other,
        }
    }
}

fn attempt_noun(attempts: &usize) -> &'static str {
    if *attempts == 1 { "attempt" } else { "attempts" }
}

impl From<serde_json::Error> for RequestError {
    fn from(error: serde_json::Error) -> Self {
        RequestError::Decode(error.to_string())
    }
}

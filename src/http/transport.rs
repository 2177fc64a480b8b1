//! Transport boundary: the single "perform an HTTP request" capability the
//! client is layered over.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use super::body::{Body, Method, PartValue};
use super::error::RequestError;

/// A fully resolved request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What a transport hands back once the server answered.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// A 200 response carrying the given JSON value.
    pub fn json_ok(value: &Value) -> Self {
        Self::new(200, "OK", value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 204 carries no body by definition.
    pub fn is_no_content(&self) -> bool {
        self.status == 204
    }

    /// Decodes the body as JSON. A 204 decodes as `null`; any other empty
    /// body is a decode error.
    pub fn json(&self) -> Result<Value, RequestError> {
        if self.is_no_content() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Standard reason phrase, or "Unknown Status" for unregistered codes.
fn reason_phrase(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown Status")
        .to_string()
}

/// Performs one HTTP exchange.
///
/// Implementations must be cancel-safe: the client enforces its deadline by
/// dropping the returned future, which has to abort the underlying call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, RequestError>;
}

/// [`Transport`] backed by a reqwest [`Client`].
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a reqwest client with the CLI user agent.
    pub fn build_default() -> Result<Self, RequestError> {
        let client = Client::builder()
            .user_agent("samplemind-cli")
            .build()
            .map_err(|e| RequestError::InvalidRequest(e.to_string()))?;

        debug!("HTTP transport initialized");
        Ok(Self::new(client))
    }

    fn build(&self, request: TransportRequest) -> Result<reqwest::RequestBuilder, RequestError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
            headers.append(name, value);
        }

        let builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(headers);

        let builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => {
                let builder = if request
                    .headers
                    .iter()
                    .any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
                {
                    builder
                } else {
                    builder.header(CONTENT_TYPE, "application/json")
                };
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
                builder.body(bytes)
            }
            Body::Multipart(form) => {
                let mut multipart = reqwest::multipart::Form::new();
                for part in form.parts().iter().cloned() {
                    multipart = match part.value {
                        PartValue::Text(text) => multipart.text(part.name, text),
                        PartValue::File {
                            file_name,
                            bytes,
                            mime,
                        } => {
                            let mut file_part =
                                reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                            if let Some(mime) = mime {
                                file_part = file_part
                                    .mime_str(&mime)
                                    .map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
                            }
                            multipart.part(part.name, file_part)
                        }
                    };
                }
                builder.multipart(multipart)
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, RequestError> {
        let response = self
            .build(request)?
            .send()
            .await
            .map_err(|e| RequestError::Network(e.to_string()))?;

        let status = response.status();
        let status_text = reason_phrase(status);
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::Network(e.to_string()))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::body::Form;
    use mockito::Matcher;
    use serde_json::json;

    fn request(method: Method, url: String, body: Body) -> TransportRequest {
        TransportRequest {
            method,
            url,
            headers: Vec::new(),
            body,
        }
    }

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::new(200, "OK", "").is_success());
        assert!(TransportResponse::new(204, "No Content", "").is_success());
        assert!(!TransportResponse::new(301, "Moved Permanently", "").is_success());
        assert!(!TransportResponse::new(404, "Not Found", "").is_success());
    }

    #[test]
    fn test_response_json_decoding() {
        let response = TransportResponse::new(200, "OK", r#"{"status":"ok"}"#);
        assert_eq!(response.json().unwrap(), json!({"status": "ok"}));

        let no_content = TransportResponse::new(204, "No Content", "");
        assert_eq!(no_content.json().unwrap(), Value::Null);

        let empty = TransportResponse::new(200, "OK", "");
        assert!(matches!(empty.json(), Err(RequestError::Decode(_))));

        let blank = TransportResponse::new(200, "OK", "  \n");
        assert!(matches!(blank.json(), Err(RequestError::Decode(_))));

        let broken = TransportResponse::new(200, "OK", "<html>");
        assert!(matches!(broken.json(), Err(RequestError::Decode(_))));
    }

    #[test]
    fn test_request_header_lookup_is_case_insensitive() {
        let mut req = request(Method::Get, "http://x/".into(), Body::Empty);
        req.headers
            .push(("Content-Type".into(), "application/json".into()));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[tokio::test]
    async fn test_send_get_returns_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"healthy"}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let response = transport
            .send(request(
                Method::Get,
                format!("{}/health", server.url()),
                Body::Empty,
            ))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.json().unwrap(), json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_send_error_status_is_not_a_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let response = transport
            .send(request(
                Method::Get,
                format!("{}/missing", server.url()),
                Body::Empty,
            ))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_send_unregistered_status_has_fallback_reason() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/edge")
            .with_status(599)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let response = transport
            .send(request(
                Method::Get,
                format!("{}/edge", server.url()),
                Body::Empty,
            ))
            .await
            .unwrap();

        assert_eq!(response.status, 599);
        assert_eq!(response.status_text, "Unknown Status");
    }

    #[tokio::test]
    async fn test_send_json_body_sets_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/project-sync")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"project_bpm": 120.0})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        transport
            .send(request(
                Method::Post,
                format!("{}/api/project-sync", server.url()),
                Body::Json(json!({"project_bpm": 120.0})),
            ))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_multipart_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/analyze")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="analysis_level""#.to_string()),
                Matcher::Regex("DETAILED".to_string()),
                Matcher::Regex(r#"filename="loop.wav""#.to_string()),
                Matcher::Regex("RIFFDATA".to_string()),
            ]))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let form = Form::new()
            .file(
                "file",
                "loop.wav",
                b"RIFFDATA".to_vec(),
                Some("audio/wav".into()),
            )
            .text("analysis_level", "DETAILED");

        let transport = ReqwestTransport::new(Client::new());
        transport
            .send(request(
                Method::Post,
                format!("{}/api/analyze", server.url()),
                Body::Multipart(form),
            ))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_connection_refused_is_network_error() {
        // Bind then drop a listener so nothing is accepting on the port.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(Client::new());
        let result = transport
            .send(request(
                Method::Get,
                format!("http://{}/health", addr),
                Body::Empty,
            ))
            .await;

        assert!(matches!(result, Err(RequestError::Network(_))));
    }

    #[tokio::test]
    async fn test_default_transport_sends_user_agent_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/info")
            .match_header("authorization", "Bearer secret-token")
            .match_header("user-agent", "samplemind-cli")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let transport = ReqwestTransport::build_default().unwrap();
        let mut req = request(
            Method::Get,
            format!("{}/api/info", server.url()),
            Body::Empty,
        );
        req.headers
            .push(("Authorization".into(), "Bearer secret-token".into()));
        transport.send(req).await.unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_mime_is_invalid_request() {
        let transport = ReqwestTransport::new(Client::new());
        let form = Form::new().file("file", "a.wav", vec![], Some("not a mime".into()));
        let result = transport.build(request(
            Method::Post,
            "http://localhost/api/analyze".into(),
            Body::Multipart(form),
        ));
        assert!(matches!(result, Err(RequestError::InvalidRequest(_))));
    }
}

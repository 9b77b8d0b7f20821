//! HTTP transport
//!
//! All network I/O of the LLM layer goes through [`HttpTransport`]. The
//! production implementation uses blocking `ureq` calls; tests swap in a mock.

use crate::error::{extract_error_message, LlmError, Result};
use serde_json::Value;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::Duration;

/// Connect timeout cap; the configured timeout governs reads.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound request, fully described
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Query parameters, percent-encoded by the transport
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Add `Authorization: Bearer <key>` when a key is present
    pub fn bearer(self, api_key: Option<&str>) -> Self {
        match api_key {
            Some(key) if !key.is_empty() => self.header("Authorization", format!("Bearer {}", key)),
            _ => self,
        }
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Convert a non-2xx response into an `Api` error
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(LlmError::Api {
                status: self.status,
                message: extract_error_message(&self.body),
            })
        }
    }
}

/// Line reader over a streaming response body
pub type LineReader = Box<dyn BufRead + Send>;

/// Blocking HTTP transport
pub trait HttpTransport: Send + Sync {
    /// Perform a request and buffer the body. Any status is returned as a
    /// response; only transport failures are errors.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Perform a request and hand back the body as a line reader.
    /// Non-2xx statuses fail with [`LlmError::Api`].
    fn send_streaming(&self, request: &HttpRequest) -> Result<LineReader>;
}

/// Builds transports bound to a request timeout
pub trait TransportFactory: Send + Sync {
    fn build(&self, timeout: Duration) -> Arc<dyn HttpTransport>;
}

/// `ureq`-backed transport
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout.min(MAX_CONNECT_TIMEOUT))
            .timeout_read(timeout)
            .build();
        Self { agent }
    }

    fn prepare(&self, request: &HttpRequest) -> ureq::Request {
        let mut req = match request.method {
            Method::Get => self.agent.get(&request.url),
            Method::Post => self.agent.post(&request.url),
        };
        for (name, value) in &request.query {
            req = req.query(name, value);
        }
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        req
    }

    fn call(&self, request: &HttpRequest) -> std::result::Result<ureq::Response, ureq::Error> {
        let req = self.prepare(request);
        match &request.body {
            Some(body) => req.send_json(body),
            None => req.call(),
        }
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        match self.call(request) {
            Ok(response) => {
                let status = response.status();
                let body = response.into_string()?;
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Ok(HttpResponse { status, body })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn send_streaming(&self, request: &HttpRequest) -> Result<LineReader> {
        let response = self.call(request)?;
        Ok(Box::new(BufReader::new(response.into_reader())))
    }
}

/// Default factory producing [`UreqTransport`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransportFactory;

impl TransportFactory for UreqTransportFactory {
    fn build(&self, timeout: Duration) -> Arc<dyn HttpTransport> {
        Arc::new(UreqTransport::new(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_skips_missing_key() {
        let req = HttpRequest::get("http://x/models").bearer(None);
        assert!(req.header_value("authorization").is_none());

        let req = HttpRequest::get("http://x/models").bearer(Some("sk-test"));
        assert_eq!(req.header_value("Authorization"), Some("Bearer sk-test"));
    }

    #[test]
    fn test_post_sets_json_content_type() {
        let req = HttpRequest::post("http://x", serde_json::json!({}));
        assert_eq!(req.header_value("content-type"), Some("application/json"));
    }

    #[test]
    fn test_query_values_are_encoded() {
        let transport = UreqTransport::new(Duration::from_secs(5));
        let req = HttpRequest::get("https://host/v1beta/models/m:streamGenerateContent?alt=sse")
            .query("key", "a&b#c+d");
        let url = transport.prepare(&req).request_url().unwrap();
        assert_eq!(
            url.as_url().as_str(),
            "https://host/v1beta/models/m:streamGenerateContent?alt=sse&key=a%26b%23c%2Bd"
        );
    }

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse {
            status: 200,
            body: "{}".to_string(),
        };
        assert!(ok.error_for_status().is_ok());

        let err = HttpResponse {
            status: 404,
            body: r#"{"error": {"message": "model not found"}}"#.to_string(),
        }
        .error_for_status()
        .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 404, ref message } if message == "model not found"));
    }
}

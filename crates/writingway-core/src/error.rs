//! Error types for Writingway Core
//!
//! Configuration and resolution failures are raised before any I/O happens.
//! Transport failures are converted from `ureq` and propagated as-is.

use thiserror::Error;

/// Result type for Writingway Core operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for LLM operations
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    /// No resolvable provider, or a required API key is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not configured, or a forced model refresh failed upstream
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        payload: Option<serde_json::Value>,
    },

    /// Non-2xx response during invocation or streaming
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network/connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Malformed response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Stream read failure or misuse of a stream consumer
    #[error("Streaming error: {0}")]
    Stream(String),
}

impl LlmError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        LlmError::Configuration(msg.into())
    }

    /// Create a provider error without an upstream payload
    pub fn provider(msg: impl Into<String>) -> Self {
        LlmError::Provider {
            message: msg.into(),
            payload: None,
        }
    }

    /// Create a provider error carrying the upstream error payload
    pub fn provider_with_payload(msg: impl Into<String>, payload: serde_json::Value) -> Self {
        LlmError::Provider {
            message: msg.into(),
            payload: Some(payload),
        }
    }

    /// The upstream rejected the credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, LlmError::Api { status: 401 | 403, .. })
    }

    /// The upstream rejected the request for exceeding the model's context.
    pub fn is_token_limit(&self) -> bool {
        match self {
            LlmError::Api {
                status: 400 | 413,
                message,
            } => {
                let message = message.to_lowercase();
                message.contains("context_length_exceeded")
                    || message.contains("maximum context length")
            }
            _ => false,
        }
    }
}

impl From<ureq::Error> for LlmError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response
                    .into_string()
                    .unwrap_or_else(|_| "Unknown error".to_string());
                LlmError::Api {
                    status,
                    message: extract_error_message(&body),
                }
            }
            ureq::Error::Transport(transport) => {
                let message = transport.to_string();
                if message.contains("timed out") {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(message)
                }
            }
        }
    }
}

impl From<std::io::Error> for LlmError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => LlmError::Timeout,
            _ => LlmError::Stream(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Parse(format!("JSON error: {}", err))
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// Handles `{"error": {"message": ..}}`, `{"error": ".."}` and falls back to
/// the raw body.
pub(crate) fn extract_error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    match json.get("error") {
        Some(serde_json::Value::String(msg)) => msg.clone(),
        Some(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| error.to_string()),
        None => json
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| body.trim().to_string()),
    }
}

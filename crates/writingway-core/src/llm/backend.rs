//! Wire-format backends
//!
//! A backend knows how one API family shapes its requests and responses:
//! where the model list lives, how auth is attached, how a chat request is
//! built and how streamed lines are decoded. It holds no state; the effective
//! settings arrive with every call.

use super::client::ClientSettings;
use super::message::ChatMessage;
use super::models::ModelDescriptor;
use super::transport::HttpRequest;
use crate::error::{LlmError, Result};
use serde_json::Value;

/// Outcome of decoding one line of a streaming body
#[derive(Debug, Clone)]
pub enum StreamLine {
    /// Keep-alive, event name, or a chunk without text
    Skip,
    /// A text fragment
    Text(String),
    /// The provider signalled the end of the stream
    Done,
    /// The provider reported an error in-stream
    Failed(LlmError),
}

/// Per-API-family request/response mapping
pub trait ProviderBackend: Send + Sync {
    /// Request listing the available models
    fn models_request(&self, settings: &ClientSettings) -> HttpRequest;

    /// Map a successful model-list body into descriptors
    fn parse_models(&self, body: &Value) -> Vec<ModelDescriptor>;

    /// Chat request, streaming or not
    fn chat_request(
        &self,
        settings: &ClientSettings,
        messages: &[ChatMessage],
        stream: bool,
    ) -> HttpRequest;

    /// Extract the text of a non-streaming completion
    fn parse_completion(&self, body: &Value) -> Result<String>;

    /// Decode one line of a streaming response
    fn parse_stream_line(&self, line: &str) -> StreamLine;
}

/// Join a base URL and a relative path with exactly one slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Payload of an SSE `data:` line, if this is one
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(|data| data.trim())
}

/// In-band `{"error": ...}` object of a JSON chunk, as an `Api` error
pub(crate) fn inline_error(json: &Value) -> Option<LlmError> {
    let error = json.get("error")?;
    let message = match error {
        Value::String(msg) => msg.clone(),
        _ => error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string(),
    };
    let status = error
        .get("code")
        .and_then(|c| c.as_u64())
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(500);
    Some(LlmError::Api { status, message })
}

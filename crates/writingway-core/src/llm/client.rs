//! Constructed provider clients
//!
//! A [`ProviderClient`] is the network-ready half of a provider: fully
//! resolved settings, a transport bound to the configured timeout, and the
//! wire backend for the provider kind. It is cheap to hold and carries no
//! mutable state of its own.

use super::backend::{ProviderBackend, StreamLine};
use super::kind::ProviderKind;
use super::message::ChatMessage;
use super::models::ModelDescriptor;
use super::transport::{HttpTransport, LineReader};
use crate::error::{extract_error_message, LlmError, Result};
use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

/// Effective configuration a client was built from
///
/// Two clients built from equal settings are interchangeable; the provider
/// cache relies on this to decide whether a cached client can be reused.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Network-ready handle for one configured provider
pub struct ProviderClient {
    settings: ClientSettings,
    transport: Arc<dyn HttpTransport>,
    backend: &'static dyn ProviderBackend,
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("kind", &self.settings.kind)
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    pub fn new(settings: ClientSettings, transport: Arc<dyn HttpTransport>) -> Self {
        let backend = settings.kind.backend();
        Self {
            settings,
            transport,
            backend,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Blocking chat completion; returns the response text
    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = self.backend.chat_request(&self.settings, messages, false);
        let response = self.transport.send(&request)?.error_for_status()?;
        self.backend.parse_completion(&response.json()?)
    }

    /// Start a streaming chat completion
    ///
    /// Fails with the upstream status when the request is rejected; errors
    /// after that point surface as items of the returned stream.
    pub fn stream(&self, messages: &[ChatMessage]) -> Result<ChunkStream> {
        let request = self.backend.chat_request(&self.settings, messages, true);
        let reader = self.transport.send_streaming(&request)?;
        Ok(ChunkStream::new(reader, self.backend))
    }

    /// Fetch the provider's model list
    ///
    /// A non-2xx answer becomes a [`LlmError::Provider`] carrying the
    /// upstream error object (or the whole body when it has none).
    pub fn fetch_models(&self) -> Result<Vec<ModelDescriptor>> {
        let request = self.backend.models_request(&self.settings);
        let response = self.transport.send(&request)?;

        if !response.is_success() {
            let message = format!(
                "Failed to fetch models ({}): {}",
                response.status,
                extract_error_message(&response.body)
            );
            return Err(match serde_json::from_str::<serde_json::Value>(&response.body) {
                Ok(body) => {
                    let payload = body.get("error").cloned().unwrap_or(body);
                    LlmError::provider_with_payload(message, payload)
                }
                Err(_) => LlmError::provider(message),
            });
        }

        Ok(self.backend.parse_models(&response.json()?))
    }
}

/// Text fragments of one streaming response, in arrival order
///
/// Ends after the provider's end-of-stream marker, at end of body, or after
/// yielding the first error.
pub struct ChunkStream {
    reader: LineReader,
    backend: &'static dyn ProviderBackend,
    buf: String,
    done: bool,
}

impl ChunkStream {
    fn new(reader: LineReader, backend: &'static dyn ProviderBackend) -> Self {
        Self {
            reader,
            backend,
            buf: String::new(),
            done: false,
        }
    }
}

impl Iterator for ChunkStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => match self.backend.parse_stream_line(self.buf.trim_end()) {
                    StreamLine::Skip => {}
                    StreamLine::Text(text) => return Some(Ok(text)),
                    StreamLine::Done => self.done = true,
                    StreamLine::Failed(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                },
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{sse_chunk, MockTransport, Reply};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn settings(kind: ProviderKind) -> ClientSettings {
        ClientSettings {
            kind,
            base_url: kind.default_endpoint().to_string(),
            api_key: Some("sk-test".to_string()),
            model: "gpt-test".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_complete_returns_text() {
        let transport = MockTransport::new(|_| {
            Reply::json(200, json!({"choices": [{"message": {"content": "Hello, echoed"}}]}))
        });
        let client = ProviderClient::new(settings(ProviderKind::OpenAI), transport.clone());

        let text = client.complete(&[ChatMessage::user("Hello")]).unwrap();
        assert_eq!(text, "Hello, echoed");
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_complete_propagates_status() {
        let transport = MockTransport::new(|_| {
            Reply::json(401, json!({"error": {"message": "Incorrect API key provided"}}))
        });
        let client = ProviderClient::new(settings(ProviderKind::OpenAI), transport);

        let err = client.complete(&[ChatMessage::user("Hello")]).unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_stream_yields_fragments_in_order() {
        let transport = MockTransport::new(|_| {
            Reply::lines(vec![
                sse_chunk("Once"),
                ": keep-alive".to_string(),
                sse_chunk(" upon"),
                "data: [DONE]".to_string(),
                sse_chunk("ignored"),
            ])
        });
        let client = ProviderClient::new(settings(ProviderKind::OpenAI), transport);

        let chunks: Vec<String> = client
            .stream(&[ChatMessage::user("Tell me")])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(chunks, vec!["Once".to_string(), " upon".to_string()]);
    }

    #[test]
    fn test_stream_ends_after_inline_error() {
        let transport = MockTransport::new(|_| {
            Reply::lines(vec![
                sse_chunk("partial"),
                r#"data: {"error": {"message": "overloaded"}}"#.to_string(),
                sse_chunk("never"),
            ])
        });
        let client = ProviderClient::new(settings(ProviderKind::OpenAI), transport);

        let items: Vec<Result<String>> = client.stream(&[ChatMessage::user("x")]).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[test]
    fn test_fetch_models_failure_carries_payload() {
        let transport = MockTransport::new(|_| {
            Reply::json(403, json!({"error": {"type": "permission_error", "message": "denied"}}))
        });
        let client = ProviderClient::new(settings(ProviderKind::Anthropic), transport);

        match client.fetch_models().unwrap_err() {
            LlmError::Provider { message, payload } => {
                assert!(message.contains("denied"));
                assert_eq!(payload, Some(json!({"type": "permission_error", "message": "denied"})));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }
}

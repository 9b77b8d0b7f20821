//! Ollama backend
//!
//! Talks to the native Ollama API (`/api/tags`, `/api/chat`) on a local
//! instance. Streaming responses are newline-delimited JSON, not SSE.

use super::backend::{join_url, ProviderBackend, StreamLine};
use super::client::ClientSettings;
use super::message::ChatMessage;
use super::models::{object_field, str_field, ModelDescriptor};
use super::transport::HttpRequest;
use crate::error::{LlmError, Result};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct OllamaBackend;

/// Native API root. Settings often carry the OpenAI-compatible `/v1`
/// endpoint; the native routes live one level up.
fn native_root(base_url: &str) -> &str {
    let trimmed = base_url.trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed)
}

impl ProviderBackend for OllamaBackend {
    fn models_request(&self, settings: &ClientSettings) -> HttpRequest {
        HttpRequest::get(join_url(native_root(&settings.base_url), "api/tags"))
    }

    fn parse_models(&self, body: &Value) -> Vec<ModelDescriptor> {
        body.get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|entry| {
                        let mut model = ModelDescriptor::new(str_field(entry, "name")?);
                        model.architecture = object_field(entry, "details");
                        Some(model)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn chat_request(
        &self,
        settings: &ClientSettings,
        messages: &[ChatMessage],
        stream: bool,
    ) -> HttpRequest {
        let body = json!({
            "model": settings.model,
            "messages": messages.iter().map(|m| {
                json!({
                    "role": m.role_str(),
                    "content": m.content
                })
            }).collect::<Vec<_>>(),
            "stream": stream,
            "options": {
                "temperature": settings.temperature,
                "num_predict": settings.max_tokens
            }
        });

        HttpRequest::post(join_url(native_root(&settings.base_url), "api/chat"), body)
    }

    fn parse_completion(&self, body: &Value) -> Result<String> {
        if let Some(error) = str_field(body, "error") {
            return Err(LlmError::Api {
                status: 500,
                message: error,
            });
        }
        body.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::Parse("response has no message.content".into()))
    }

    fn parse_stream_line(&self, line: &str) -> StreamLine {
        let line = line.trim();
        if line.is_empty() {
            return StreamLine::Skip;
        }

        let Ok(json) = serde_json::from_str::<Value>(line) else {
            return StreamLine::Skip;
        };

        if let Some(error) = str_field(&json, "error") {
            return StreamLine::Failed(LlmError::Api {
                status: 500,
                message: error,
            });
        }

        let content = json
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("");

        if !content.is_empty() {
            StreamLine::Text(content.to_string())
        } else if json.get("done").and_then(|v| v.as_bool()).unwrap_or(false) {
            StreamLine::Done
        } else {
            StreamLine::Skip
        }
    }
}

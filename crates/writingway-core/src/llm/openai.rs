//! OpenAI-compatible backend
//!
//! Speaks the chat completions API used by OpenAI, OpenRouter, TogetherAI,
//! LM Studio and most self-hosted servers.

use super::backend::{inline_error, join_url, sse_data, ProviderBackend, StreamLine};
use super::client::ClientSettings;
use super::message::ChatMessage;
use super::models::{object_field, str_field, u64_field, ModelDescriptor};
use super::transport::HttpRequest;
use crate::error::{LlmError, Result};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiCompatBackend;

impl ProviderBackend for OpenAiCompatBackend {
    fn models_request(&self, settings: &ClientSettings) -> HttpRequest {
        HttpRequest::get(join_url(&settings.base_url, "models")).bearer(settings.api_key.as_deref())
    }

    fn parse_models(&self, body: &Value) -> Vec<ModelDescriptor> {
        // TogetherAI answers with a bare array instead of {"data": [...]}
        let entries = body
            .get("data")
            .and_then(|d| d.as_array())
            .or_else(|| body.as_array());

        entries
            .map(|arr| arr.iter().filter_map(parse_model).collect())
            .unwrap_or_default()
    }

    fn chat_request(
        &self,
        settings: &ClientSettings,
        messages: &[ChatMessage],
        stream: bool,
    ) -> HttpRequest {
        let conversation: Vec<Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role_str(),
                    "content": msg.content
                })
            })
            .collect();

        let body = json!({
            "model": settings.model,
            "messages": conversation,
            "stream": stream,
            "temperature": settings.temperature,
            "max_tokens": settings.max_tokens
        });

        HttpRequest::post(join_url(&settings.base_url, "chat/completions"), body)
            .bearer(settings.api_key.as_deref())
    }

    fn parse_completion(&self, body: &Value) -> Result<String> {
        if let Some(err) = inline_error(body) {
            return Err(err);
        }
        body.get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::Parse("completion has no choices[0].message.content".into()))
    }

    fn parse_stream_line(&self, line: &str) -> StreamLine {
        let Some(data) = sse_data(line) else {
            return StreamLine::Skip;
        };

        if data == "[DONE]" {
            return StreamLine::Done;
        }

        let Ok(json) = serde_json::from_str::<Value>(data) else {
            return StreamLine::Skip;
        };

        if let Some(err) = inline_error(&json) {
            return StreamLine::Failed(err);
        }

        let Some(choice) = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
        else {
            return StreamLine::Skip;
        };

        let content = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("");

        if !content.is_empty() {
            return StreamLine::Text(content.to_string());
        }

        match choice.get("finish_reason") {
            Some(reason) if !reason.is_null() => StreamLine::Done,
            _ => StreamLine::Skip,
        }
    }
}

fn parse_model(entry: &Value) -> Option<ModelDescriptor> {
    let id = str_field(entry, "id")?;
    let name = str_field(entry, "name")
        .or_else(|| str_field(entry, "display_name"))
        .unwrap_or_else(|| id.clone());

    Some(ModelDescriptor {
        id,
        name,
        description: str_field(entry, "description"),
        context_length: u64_field(entry, "context_length"),
        architecture: object_field(entry, "architecture").or_else(|| object_field(entry, "config")),
        pricing: object_field(entry, "pricing"),
        license: str_field(entry, "license"),
    })
}

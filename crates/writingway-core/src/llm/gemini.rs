//! Gemini (Google AI) backend
//!
//! The API key travels as a `key` query parameter; assistant turns use the
//! `model` role and the system prompt goes into `system_instruction`.

use super::backend::{inline_error, join_url, sse_data, ProviderBackend, StreamLine};
use super::client::ClientSettings;
use super::message::{ChatMessage, Role};
use super::models::{str_field, u64_field, ModelDescriptor};
use super::transport::HttpRequest;
use crate::error::{LlmError, Result};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiBackend;

/// Model names come back as `models/<id>`; requests want the bare id.
fn bare_model_id(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

fn with_key(request: HttpRequest, settings: &ClientSettings) -> HttpRequest {
    let key = settings.api_key.as_deref().unwrap_or_default();
    request.query("key", key)
}

impl ProviderBackend for GeminiBackend {
    fn models_request(&self, settings: &ClientSettings) -> HttpRequest {
        with_key(HttpRequest::get(join_url(&settings.base_url, "models")), settings)
    }

    fn parse_models(&self, body: &Value) -> Vec<ModelDescriptor> {
        body.get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|entry| {
                        let id = bare_model_id(&str_field(entry, "name")?).to_string();
                        let name = str_field(entry, "displayName").unwrap_or_else(|| id.clone());
                        let mut model = ModelDescriptor::new(id).with_name(name);
                        model.description = str_field(entry, "description");
                        model.context_length = u64_field(entry, "inputTokenLimit");
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
        let mut contents: Vec<Value> = Vec::new();
        let mut system_instruction: Option<String> = None;

        for msg in messages {
            let role = match msg.role {
                Role::System => {
                    system_instruction = Some(msg.content.clone());
                    continue;
                }
                Role::Assistant => "model",
                Role::User => "user",
            };

            contents.push(json!({
                "role": role,
                "parts": [{ "text": msg.content }]
            }));
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": settings.max_tokens,
                "temperature": settings.temperature
            }
        });

        if let Some(instruction) = system_instruction {
            body["system_instruction"] = json!({
                "parts": [{ "text": instruction }]
            });
        }

        let model = bare_model_id(&settings.model);
        let path = if stream {
            format!("models/{}:streamGenerateContent?alt=sse", model)
        } else {
            format!("models/{}:generateContent", model)
        };

        with_key(HttpRequest::post(join_url(&settings.base_url, &path), body), settings)
    }

    fn parse_completion(&self, body: &Value) -> Result<String> {
        if let Some(err) = inline_error(body) {
            return Err(err);
        }
        if body.get("candidates").is_none() {
            return Err(LlmError::Parse("response has no candidates".into()));
        }
        Ok(candidate_text(body))
    }

    fn parse_stream_line(&self, line: &str) -> StreamLine {
        let Some(data) = sse_data(line) else {
            return StreamLine::Skip;
        };

        let Ok(json) = serde_json::from_str::<Value>(data) else {
            return StreamLine::Skip;
        };

        if let Some(err) = inline_error(&json) {
            return StreamLine::Failed(err);
        }

        let text = candidate_text(&json);
        if text.is_empty() {
            StreamLine::Skip
        } else {
            StreamLine::Text(text)
        }
    }
}

/// Concatenate the text parts of every candidate
fn candidate_text(json: &Value) -> String {
    json.get("candidates")
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
        .filter_map(|candidate| candidate.get("content"))
        .filter_map(|content| content.get("parts").and_then(|p| p.as_array()))
        .flatten()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect()
}

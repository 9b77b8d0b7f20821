//! Anthropic backend
//!
//! Messages API with `x-api-key` auth and the system prompt split out of the
//! conversation.

use super::backend::{join_url, sse_data, ProviderBackend, StreamLine};
use super::client::ClientSettings;
use super::message::{ChatMessage, Role};
use super::models::{str_field, ModelDescriptor};
use super::transport::HttpRequest;
use crate::error::{LlmError, Result};
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicBackend;

impl AnthropicBackend {
    fn authorize(&self, request: HttpRequest, settings: &ClientSettings) -> HttpRequest {
        request
            .header("x-api-key", settings.api_key.clone().unwrap_or_default())
            .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

impl ProviderBackend for AnthropicBackend {
    fn models_request(&self, settings: &ClientSettings) -> HttpRequest {
        self.authorize(HttpRequest::get(join_url(&settings.base_url, "models")), settings)
    }

    fn parse_models(&self, body: &Value) -> Vec<ModelDescriptor> {
        body.get("data")
            .and_then(|d| d.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|entry| {
                        let id = str_field(entry, "id")?;
                        let name = str_field(entry, "display_name").unwrap_or_else(|| id.clone());
                        Some(ModelDescriptor::new(id).with_name(name))
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
        // Separate system message from conversation
        let mut system_content = String::new();
        let mut conversation: Vec<Value> = Vec::new();

        for msg in messages {
            if msg.role == Role::System {
                system_content.push_str(&msg.content);
                system_content.push('\n');
            } else {
                conversation.push(json!({
                    "role": msg.role_str(),
                    "content": msg.content
                }));
            }
        }

        let mut body = json!({
            "model": settings.model,
            "max_tokens": settings.max_tokens,
            "temperature": settings.temperature,
            "stream": stream,
            "messages": conversation
        });

        if !system_content.is_empty() {
            body["system"] = Value::String(system_content.trim().to_string());
        }

        self.authorize(
            HttpRequest::post(join_url(&settings.base_url, "messages"), body),
            settings,
        )
    }

    fn parse_completion(&self, body: &Value) -> Result<String> {
        if body.get("type").and_then(|t| t.as_str()) == Some("error") {
            return Err(stream_error(body));
        }
        let blocks = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LlmError::Parse("message has no content blocks".into()))?;

        Ok(blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""))
    }

    fn parse_stream_line(&self, line: &str) -> StreamLine {
        let Some(data) = sse_data(line) else {
            return StreamLine::Skip;
        };

        let Ok(json) = serde_json::from_str::<Value>(data) else {
            return StreamLine::Skip;
        };

        match json.get("type").and_then(|t| t.as_str()).unwrap_or("") {
            "content_block_delta" => json
                .get("delta")
                .and_then(|d| d.get("text"))
                .and_then(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .map(|t| StreamLine::Text(t.to_string()))
                .unwrap_or(StreamLine::Skip),
            "message_stop" => StreamLine::Done,
            "error" => StreamLine::Failed(stream_error(&json)),
            _ => StreamLine::Skip,
        }
    }
}

fn stream_error(json: &Value) -> LlmError {
    let error = json.get("error");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error");
    let status = match error.and_then(|e| e.get("type")).and_then(|t| t.as_str()) {
        Some("authentication_error") => 401,
        Some("permission_error") => 403,
        Some("invalid_request_error") => 400,
        Some("rate_limit_error") => 429,
        Some("overloaded_error") => 529,
        _ => 500,
    };
    LlmError::Api {
        status,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderKind;

    fn settings() -> ClientSettings {
        ClientSettings {
            kind: ProviderKind::Anthropic,
            base_url: ProviderKind::Anthropic.default_endpoint().to_string(),
            api_key: Some("sk-ant".to_string()),
            model: "claude-3-haiku-20240307".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_models_request_headers() {
        let req = AnthropicBackend.models_request(&settings());
        assert_eq!(req.url, "https://api.anthropic.com/v1/models");
        assert_eq!(req.header_value("x-api-key"), Some("sk-ant"));
        assert_eq!(req.header_value("anthropic-version"), Some("2023-06-01"));
        assert!(req.header_value("Authorization").is_none());
    }

    #[test]
    fn test_system_prompt_split_out() {
        let messages = [
            ChatMessage::system("You are a copy editor."),
            ChatMessage::user("Fix this."),
        ];
        let req = AnthropicBackend.chat_request(&settings(), &messages, false);
        let body = req.body.unwrap();
        assert_eq!(body["system"], "You are a copy editor.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(req.url, "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_parse_completion_joins_text_blocks() {
        let body = json!({"content": [
            {"type": "text", "text": "Once "},
            {"type": "text", "text": "upon a time"}
        ]});
        assert_eq!(AnthropicBackend.parse_completion(&body).unwrap(), "Once upon a time");
    }

    #[test]
    fn test_stream_error_is_typed() {
        let line = r#"data: {"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        match AnthropicBackend.parse_stream_line(line) {
            StreamLine::Failed(err) => assert!(err.is_auth_failure()),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_delta_and_stop() {
        let delta = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        assert!(matches!(AnthropicBackend.parse_stream_line(delta), StreamLine::Text(ref t) if t == "Hi"));
        assert!(matches!(
            AnthropicBackend.parse_stream_line(r#"data: {"type":"message_stop"}"#),
            StreamLine::Done
        ));
        assert!(matches!(AnthropicBackend.parse_stream_line("event: ping"), StreamLine::Skip));
    }
}

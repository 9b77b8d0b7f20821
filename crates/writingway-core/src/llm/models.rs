//! Model descriptors
//!
//! Providers return wildly different model-list shapes. Each backend maps its
//! own JSON into [`ModelDescriptor`]; the helpers here cover the shared bits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata about one model offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Identifier sent back to the provider when invoking
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Context window in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,

    /// Architecture / family metadata as reported upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Value>,

    /// Pricing metadata (OpenRouter, TogetherAI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl ModelDescriptor {
    /// Descriptor whose display name equals its id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            context_length: None,
            architecture: None,
            pricing: None,
            license: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_context_length(mut self, context_length: u64) -> Self {
        self.context_length = Some(context_length);
        self
    }
}

/// Sort a model list by id, newest-first when `descending`.
pub fn sort_models(models: &mut [ModelDescriptor], descending: bool) {
    if descending {
        models.sort_by(|a, b| b.id.cmp(&a.id));
    } else {
        models.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

pub(crate) fn u64_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(|v| v.as_u64())
}

pub(crate) fn object_field(value: &Value, key: &str) -> Option<Value> {
    value.get(key).filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_models() {
        let mut models = vec![
            ModelDescriptor::new("claude-3-haiku"),
            ModelDescriptor::new("claude-3-5-sonnet"),
            ModelDescriptor::new("claude-3-opus"),
        ];
        sort_models(&mut models, true);
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["claude-3-opus", "claude-3-haiku", "claude-3-5-sonnet"]);

        sort_models(&mut models, false);
        assert_eq!(models[0].id, "claude-3-5-sonnet");
    }

    #[test]
    fn test_field_helpers() {
        let json = serde_json::json!({"id": "m", "empty": "", "ctx": 4096, "arch": null});
        assert_eq!(str_field(&json, "id").as_deref(), Some("m"));
        assert_eq!(str_field(&json, "empty"), None);
        assert_eq!(u64_field(&json, "ctx"), Some(4096));
        assert_eq!(object_field(&json, "arch"), None);
    }
}

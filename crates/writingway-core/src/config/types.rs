//! Configuration types for Writingway
//!
//! Defines the structure of `.writingway.toml` configuration.

use crate::llm::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Library-wide sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Library-wide completion budget
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Request timeout in seconds when a config does not set one
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WritingwayConfig {
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmSettings,
}

/// LLM configuration section
///
/// A mapping from a user-chosen provider label to its configuration, plus
/// the label of the active entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Label of the provider used when a call does not name one
    #[serde(default)]
    pub active_provider: String,

    /// Provider configurations keyed by label
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            active_provider: ProviderKind::OpenAI.name().to_string(),
            providers: default_providers(),
        }
    }
}

/// Individual provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind tag ("OpenAI", "Anthropic", ...)
    pub provider: String,

    /// Base URL; empty means the kind's default endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key (supports ${ENV_VAR} syntax)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Selected model; empty means the provider's default
    #[serde(default)]
    pub model: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ProviderConfig {
    /// Create an empty configuration for a provider kind
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            provider: kind.name().to_string(),
            endpoint: None,
            api_key: None,
            model: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the kind tag. Unknown tags resolve to `None`.
    pub fn kind(&self) -> Option<ProviderKind> {
        ProviderKind::from_name(&self.provider)
    }

    /// Endpoint if set and non-empty
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(self.endpoint.as_deref())
    }

    /// API key if set and non-empty
    pub fn api_key(&self) -> Option<&str> {
        non_empty(self.api_key.as_deref())
    }

    /// Model if set and non-empty
    pub fn model(&self) -> Option<&str> {
        non_empty(self.model.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Create default provider configurations
fn default_providers() -> BTreeMap<String, ProviderConfig> {
    let mut providers = BTreeMap::new();

    providers.insert(
        "OpenAI".to_string(),
        ProviderConfig::new(ProviderKind::OpenAI)
            .with_endpoint("https://api.openai.com/v1")
            .with_model("gpt-3.5-turbo"),
    );

    // Ollama - local, no API key needed
    providers.insert(
        "Ollama".to_string(),
        ProviderConfig::new(ProviderKind::Ollama)
            .with_endpoint("http://localhost:11434/v1")
            .with_timeout(240),
    );

    providers.insert(
        "OpenRouter".to_string(),
        ProviderConfig::new(ProviderKind::OpenRouter)
            .with_endpoint("https://openrouter.ai/api/v1/")
            .with_timeout(60),
    );

    providers.insert(
        "LMStudio".to_string(),
        ProviderConfig::new(ProviderKind::LMStudio),
    );

    providers
}

impl LlmSettings {
    /// Settings with no providers and no active entry
    pub fn empty() -> Self {
        Self {
            active_provider: String::new(),
            providers: BTreeMap::new(),
        }
    }

    /// Get a provider config by label
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get the active provider config
    pub fn active_config(&self) -> Option<&ProviderConfig> {
        self.get_provider(&self.active_provider)
    }

    /// Insert or replace a provider entry
    pub fn upsert_provider(&mut self, name: impl Into<String>, config: ProviderConfig) {
        self.providers.insert(name.into(), config);
    }

    /// Remove a provider entry.
    ///
    /// When the removed entry was active, the first remaining label becomes
    /// active (or none when the map is now empty).
    pub fn delete_provider(&mut self, name: &str) -> bool {
        if self.providers.remove(name).is_none() {
            return false;
        }
        if self.active_provider == name {
            self.active_provider = self.providers.keys().next().cloned().unwrap_or_default();
        }
        true
    }

    /// Make a known label active
    pub fn set_active(&mut self, name: &str) -> bool {
        if !self.providers.contains_key(name) {
            return false;
        }
        self.active_provider = name.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_settings() {
        let settings = LlmSettings::default();
        assert_eq!(settings.active_provider, "OpenAI");
        assert!(settings.providers.contains_key("Ollama"));
        assert_eq!(settings.providers["Ollama"].timeout, 240);
    }

    #[test]
    fn test_unknown_kind_still_parses() {
        let toml = r#"
            active_provider = "Mystery"

            [providers.Mystery]
            provider = "Cohere"
            api_key = "abc"
        "#;
        let settings: LlmSettings = toml::from_str(toml).unwrap();
        let config = settings.active_config().unwrap();
        assert_eq!(config.kind(), None);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_empty_fields_read_as_absent() {
        let config = ProviderConfig::new(ProviderKind::LMStudio)
            .with_endpoint("")
            .with_api_key("  ");
        assert_eq!(config.endpoint(), None);
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_delete_active_reassigns() {
        let mut settings = LlmSettings::default();
        assert!(settings.delete_provider("OpenAI"));
        assert_eq!(settings.active_provider, "LMStudio");
        assert!(!settings.delete_provider("OpenAI"));

        let mut single = LlmSettings::empty();
        single.upsert_provider("Solo", ProviderConfig::new(ProviderKind::Custom));
        assert!(single.set_active("Solo"));
        assert!(single.delete_provider("Solo"));
        assert_eq!(single.active_provider, "");
    }

    #[test]
    fn test_set_active_requires_known_label() {
        let mut settings = LlmSettings::default();
        assert!(!settings.set_active("Nope"));
        assert!(settings.set_active("Ollama"));
        assert_eq!(settings.active_config().unwrap().provider, "Ollama");
    }
}

//! Provider kinds
//!
//! The supported backend families form a closed set. Everything that differs
//! between them at the configuration level (default endpoint, key policy,
//! fallback model, wire format) is looked up here instead of being branched
//! on by name elsewhere.

use super::anthropic::AnthropicBackend;
use super::backend::ProviderBackend;
use super::gemini::GeminiBackend;
use super::ollama::OllamaBackend;
use super::openai::OpenAiCompatBackend;
use std::fmt;

static OPENAI_COMPAT: OpenAiCompatBackend = OpenAiCompatBackend;
static ANTHROPIC: AnthropicBackend = AnthropicBackend;
static GEMINI: GeminiBackend = GeminiBackend;
static OLLAMA: OllamaBackend = OllamaBackend;

/// Backend family of a configured provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Gemini,
    Ollama,
    OpenRouter,
    TogetherAI,
    LMStudio,
    Custom,
}

impl ProviderKind {
    /// Every supported kind, in display order
    pub const ALL: [ProviderKind; 8] = [
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::Ollama,
        ProviderKind::OpenRouter,
        ProviderKind::TogetherAI,
        ProviderKind::LMStudio,
        ProviderKind::Custom,
    ];

    /// Stable identifier stored in settings files
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Ollama => "Ollama",
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::TogetherAI => "TogetherAI",
            ProviderKind::LMStudio => "LMStudio",
            ProviderKind::Custom => "Custom",
        }
    }

    /// Resolve a kind tag. Unknown tags yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com/v1/",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1/",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/",
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1/",
            ProviderKind::TogetherAI => "https://api.together.xyz/v1",
            ProviderKind::LMStudio => "http://localhost:1234/v1",
            ProviderKind::Custom => "http://localhost:11434/v1/",
        }
    }

    /// Remote commercial providers refuse unauthenticated calls.
    pub fn requires_api_key(&self) -> bool {
        matches!(
            self,
            ProviderKind::OpenAI
                | ProviderKind::Anthropic
                | ProviderKind::Gemini
                | ProviderKind::OpenRouter
                | ProviderKind::TogetherAI
        )
    }

    /// Key sent when none is configured; OpenAI-compatible local servers
    /// still expect the header to be present.
    pub fn placeholder_api_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::LMStudio | ProviderKind::Custom => Some("not-needed"),
            _ => None,
        }
    }

    /// Model used when neither the call nor the config names one
    pub fn fallback_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some("claude-3-haiku-20240307"),
            ProviderKind::Gemini => Some("gemini-2.0-flash"),
            ProviderKind::LMStudio => Some("local-model"),
            ProviderKind::Custom => Some("custom-model"),
            _ => None,
        }
    }

    /// Newest-first listing for providers whose ids embed a date or version.
    pub fn sorts_models_descending(&self) -> bool {
        matches!(self, ProviderKind::Anthropic | ProviderKind::Gemini)
    }

    /// Wire format implementation for this kind
    pub fn backend(&self) -> &'static dyn ProviderBackend {
        match self {
            ProviderKind::Anthropic => &ANTHROPIC,
            ProviderKind::Gemini => &GEMINI,
            ProviderKind::Ollama => &OLLAMA,
            ProviderKind::OpenAI
            | ProviderKind::OpenRouter
            | ProviderKind::TogetherAI
            | ProviderKind::LMStudio
            | ProviderKind::Custom => &OPENAI_COMPAT,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_kind_is_none() {
        assert_eq!(ProviderKind::from_name("Cohere"), None);
        assert_eq!(ProviderKind::from_name("openai"), None);
    }

    #[test]
    fn test_local_providers_need_no_key() {
        assert!(!ProviderKind::Ollama.requires_api_key());
        assert!(!ProviderKind::LMStudio.requires_api_key());
        assert!(!ProviderKind::Custom.requires_api_key());
        assert!(ProviderKind::Anthropic.requires_api_key());
        assert!(ProviderKind::TogetherAI.requires_api_key());
    }

    #[test]
    fn test_placeholder_keys() {
        assert_eq!(ProviderKind::Custom.placeholder_api_key(), Some("not-needed"));
        assert_eq!(ProviderKind::OpenAI.placeholder_api_key(), None);
    }
}

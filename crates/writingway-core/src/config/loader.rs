//! Configuration loader with environment variable expansion
//!
//! Loads configuration from `.writingway.toml` in the project root or the
//! user config directory.

use super::types::{ProviderConfig, WritingwayConfig};
use super::writer::{config_path, user_config_path};
use crate::llm::ProviderKind;
use regex::Regex;
use std::path::Path;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to encode JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

const ENV_VAR_PATTERN: &str = r"\$\{([^}]+)\}";

/// Load configuration from various sources
///
/// Priority order:
/// 1. Project-level `.writingway.toml`
/// 2. User-level `~/.config/writingway/config.toml`
/// 3. Default configuration
pub fn load_config(project_dir: &Path) -> Result<WritingwayConfig, ConfigError> {
    let project_config = config_path(project_dir);
    if project_config.exists() {
        return load_from_file(&project_config);
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return load_from_file(&user_config);
        }
    }

    Ok(apply_env_overrides(WritingwayConfig::default()))
}

/// Load configuration from a specific file
pub fn load_from_file(path: &Path) -> Result<WritingwayConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: WritingwayConfig = toml::from_str(&content)?;

    expand_env_vars(&mut config);
    config = apply_env_overrides(config);

    tracing::debug!(
        path = %path.display(),
        providers = config.llm.providers.len(),
        "loaded configuration"
    );
    Ok(config)
}

/// Expand ${VAR} patterns in string values
fn expand_env_vars(config: &mut WritingwayConfig) {
    let Ok(env_regex) = Regex::new(ENV_VAR_PATTERN) else {
        return;
    };

    for provider in config.llm.providers.values_mut() {
        if let Some(ref api_key) = provider.api_key {
            provider.api_key = Some(expand_string(api_key, &env_regex));
        }
        if let Some(ref endpoint) = provider.endpoint {
            provider.endpoint = Some(expand_string(endpoint, &env_regex));
        }
    }
}

/// Expand environment variables in a single string
fn expand_string(s: &str, regex: &Regex) -> String {
    regex
        .replace_all(s, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Apply environment variable overrides for common settings
///
/// Keys land on the entry labelled after the provider kind, which is created
/// when missing:
/// - OPENAI_API_KEY -> OpenAI
/// - ANTHROPIC_API_KEY -> Anthropic
/// - GEMINI_API_KEY / GOOGLE_API_KEY -> Gemini
/// - OPENROUTER_API_KEY -> OpenRouter
/// - TOGETHER_API_KEY -> TogetherAI
/// - OLLAMA_BASE_URL -> Ollama endpoint
/// - WRITINGWAY_ACTIVE_PROVIDER -> active provider label
fn apply_env_overrides(mut config: WritingwayConfig) -> WritingwayConfig {
    let key_vars: [(ProviderKind, &[&str]); 5] = [
        (ProviderKind::OpenAI, &["OPENAI_API_KEY"]),
        (ProviderKind::Anthropic, &["ANTHROPIC_API_KEY"]),
        (ProviderKind::Gemini, &["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
        (ProviderKind::OpenRouter, &["OPENROUTER_API_KEY"]),
        (ProviderKind::TogetherAI, &["TOGETHER_API_KEY"]),
    ];

    for (kind, vars) in key_vars {
        let key = vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.is_empty());
        if let Some(key) = key {
            provider_entry(&mut config, kind).api_key = Some(key);
        }
    }

    if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
        if !url.is_empty() {
            provider_entry(&mut config, ProviderKind::Ollama).endpoint = Some(url);
        }
    }

    if let Ok(active) = std::env::var("WRITINGWAY_ACTIVE_PROVIDER") {
        if !active.is_empty() {
            config.llm.active_provider = active;
        }
    }

    config
}

fn provider_entry(config: &mut WritingwayConfig, kind: ProviderKind) -> &mut ProviderConfig {
    config
        .llm
        .providers
        .entry(kind.name().to_string())
        .or_insert_with(|| ProviderConfig::new(kind))
}

/// Create a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Writingway Configuration
# Place this file in your project root as .writingway.toml
# or in ~/.config/writingway/config.toml for global settings

[llm]
# Label of the provider entry used when a call does not name one
active_provider = "OpenAI"

[llm.providers.OpenAI]
provider = "OpenAI"
endpoint = "https://api.openai.com/v1"
api_key = "${OPENAI_API_KEY}"
model = "gpt-4o-mini"
timeout = 30

[llm.providers.Claude]
provider = "Anthropic"
api_key = "${ANTHROPIC_API_KEY}"
model = "claude-3-haiku-20240307"

[llm.providers.Ollama]
provider = "Ollama"
endpoint = "http://localhost:11434"
model = "llama3"
timeout = 240

# Several entries may share a kind, e.g. two OpenAI-compatible servers
[llm.providers."Workstation"]
provider = "Custom"
endpoint = "http://192.168.1.20:8080/v1/"
model = "mistral-7b-instruct"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmSettings;

    #[test]
    fn test_default_config() {
        let config = WritingwayConfig::default();
        assert_eq!(config.llm.active_provider, "OpenAI");
        assert!(config.llm.providers.contains_key("Ollama"));
    }

    #[test]
    fn test_sample_config_parses() {
        let config: WritingwayConfig = toml::from_str(sample_config()).unwrap();
        assert_eq!(config.llm.providers.len(), 4);
        assert_eq!(
            config.llm.providers["Workstation"].kind(),
            Some(ProviderKind::Custom)
        );
    }

    #[test]
    fn test_expand_env_var() {
        let regex = Regex::new(ENV_VAR_PATTERN).unwrap();
        std::env::set_var("WW_TEST_VAR", "test_value");
        let result = expand_string("prefix_${WW_TEST_VAR}_suffix", &regex);
        assert_eq!(result, "prefix_test_value_suffix");
        std::env::remove_var("WW_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let regex = Regex::new(ENV_VAR_PATTERN).unwrap();
        let result = expand_string("${WW_NONEXISTENT_VAR}", &regex);
        assert_eq!(result, "${WW_NONEXISTENT_VAR}");
    }

    #[test]
    fn test_load_from_file_expands_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".writingway.toml");
        std::fs::write(
            &path,
            r#"
[llm]
active_provider = "Mine"

[llm.providers.Mine]
provider = "Custom"
api_key = "${WW_LOADER_TEST_KEY}"
"#,
        )
        .unwrap();

        std::env::set_var("WW_LOADER_TEST_KEY", "sk-from-env");
        let config = load_config(dir.path()).unwrap();
        std::env::remove_var("WW_LOADER_TEST_KEY");

        let mine = config.llm.get_provider("Mine").unwrap();
        assert_eq!(mine.api_key(), Some("sk-from-env"));
        assert_eq!(config.llm.active_provider, "Mine");
    }

    #[test]
    fn test_parse_error_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[llm\nactive_provider = ").unwrap();
        assert!(matches!(
            load_from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_empty_settings_have_no_active() {
        let settings = LlmSettings::empty();
        assert!(settings.active_config().is_none());
    }
}

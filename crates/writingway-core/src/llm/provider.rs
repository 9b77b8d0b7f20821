//! Configured providers
//!
//! A [`Provider`] binds one named [`ProviderConfig`] to its kind and owns two
//! caches: the lazily built [`ProviderClient`] and the last successfully
//! fetched model list.

use super::client::{ClientSettings, ProviderClient};
use super::kind::ProviderKind;
use super::message::ChatMessage;
use super::models::{sort_models, ModelDescriptor};
use super::transport::TransportFactory;
use crate::config::{ProviderConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::error::{LlmError, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Context window assumed when the model list has no figure for the model
pub const DEFAULT_CONTEXT_WINDOW: u64 = 4096;

/// Placeholder labels the UI uses for "whatever is active"
const DEFAULT_SENTINELS: [&str; 2] = ["Local", "Default"];

/// Per-call overrides of the stored configuration
///
/// Every field is optional; empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn provider_name(&self) -> Option<&str> {
        non_empty(&self.provider)
    }

    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }

    pub fn endpoint(&self) -> Option<&str> {
        non_empty(&self.endpoint)
    }

    pub fn model(&self) -> Option<&str> {
        non_empty(&self.model)
    }

    /// `"Local"` and `"Default"` stand for the active provider.
    pub fn is_default_sentinel(name: &str) -> bool {
        DEFAULT_SENTINELS.contains(&name)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// One named provider configuration with its client and model caches
pub struct Provider {
    name: String,
    kind: ProviderKind,
    config: ProviderConfig,
    transports: Arc<dyn TransportFactory>,
    client: Mutex<Option<Arc<ProviderClient>>>,
    models: RwLock<Option<Vec<ModelDescriptor>>>,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        config: ProviderConfig,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            config,
            transports,
            client: Mutex::new(None),
            models: RwLock::new(None),
        }
    }

    /// Label this provider was configured under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Backend family identifier ("OpenAI", "Anthropic", ...)
    pub fn provider_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn default_endpoint(&self) -> &'static str {
        self.kind.default_endpoint()
    }

    pub fn requires_api_key(&self) -> bool {
        self.kind.requires_api_key()
    }

    /// Stored endpoint, or the kind's default
    pub fn base_url(&self) -> &str {
        self.config.endpoint().unwrap_or(self.kind.default_endpoint())
    }

    /// Model calls use when no override names one
    pub fn current_model(&self) -> String {
        self.config
            .model()
            .or(self.kind.fallback_model())
            .unwrap_or_default()
            .to_string()
    }

    /// Merge stored configuration with per-call overrides.
    ///
    /// Precedence is override, then stored config, then the kind default.
    pub fn effective_settings(&self, overrides: &Overrides) -> ClientSettings {
        let base_url = overrides
            .endpoint()
            .unwrap_or_else(|| self.base_url())
            .to_string();

        let api_key = overrides
            .api_key()
            .or(self.config.api_key())
            .or(self.kind.placeholder_api_key())
            .map(|key| key.to_string());

        let model_override = overrides.model().filter(|model| {
            // The UI's "Local Model" placeholder is not a real Ollama tag
            self.kind != ProviderKind::Ollama || !model.starts_with("Local")
        });
        let model = model_override
            .map(|model| model.to_string())
            .unwrap_or_else(|| self.current_model());

        ClientSettings {
            kind: self.kind,
            base_url,
            api_key,
            model,
            timeout_secs: overrides.timeout.unwrap_or(self.config.timeout),
            temperature: overrides
                .temperature
                .or(self.config.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: overrides
                .max_tokens
                .or(self.config.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    /// Fail when the kind needs a key and none resolves.
    pub fn ensure_api_key(&self, overrides: &Overrides) -> Result<()> {
        let settings = self.effective_settings(overrides);
        self.check_api_key(&settings)
    }

    fn check_api_key(&self, settings: &ClientSettings) -> Result<()> {
        if self.kind.requires_api_key() && settings.api_key.is_none() {
            return Err(LlmError::configuration(format!(
                "API key is required for {} ({})",
                self.name, self.kind
            )));
        }
        Ok(())
    }

    fn build_client(&self, settings: ClientSettings) -> ProviderClient {
        let transport = self
            .transports
            .build(Duration::from_secs(settings.timeout_secs));
        ProviderClient::new(settings, transport)
    }

    /// Return the cached client, building one on first use or when the
    /// effective settings changed since it was built.
    pub fn get_client(&self, overrides: &Overrides) -> Result<Arc<ProviderClient>> {
        let settings = self.effective_settings(overrides);
        self.check_api_key(&settings)?;

        let mut cached = self.client.lock();
        if let Some(client) = cached.as_ref() {
            if client.settings() == &settings {
                return Ok(Arc::clone(client));
            }
            debug!(provider = %self.name, "Settings changed, rebuilding client");
        }

        debug!(provider = %self.name, kind = %self.kind, model = %settings.model, "Building client");
        let client = Arc::new(self.build_client(settings));
        *cached = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Drop the cached client; the next call builds a fresh one.
    pub fn reset_client(&self) {
        if self.client.lock().take().is_some() {
            debug!(provider = %self.name, "Client reset");
        }
    }

    pub fn has_client(&self) -> bool {
        self.client.lock().is_some()
    }

    /// Last successfully fetched model list
    pub fn cached_models(&self) -> Option<Vec<ModelDescriptor>> {
        self.models.read().clone()
    }

    /// List the provider's models.
    ///
    /// Without `force_refresh` a cached list is returned as-is, and a failed
    /// fetch yields the previous list (or an empty one). With
    /// `force_refresh` a failed fetch is an error. The cache is only ever
    /// replaced by a complete, successful fetch.
    pub fn list_models(&self, force_refresh: bool) -> Result<Vec<ModelDescriptor>> {
        if !force_refresh {
            if let Some(models) = self.models.read().as_ref() {
                return Ok(models.clone());
            }
        }

        let client = self.get_client(&Overrides::default())?;

        match client.fetch_models() {
            Ok(mut models) => {
                if self.kind.sorts_models_descending() {
                    sort_models(&mut models, true);
                }
                debug!(provider = %self.name, count = models.len(), "Fetched models");
                *self.models.write() = Some(models.clone());
                Ok(models)
            }
            Err(err) if force_refresh => Err(match err {
                LlmError::Provider { .. } => err,
                other => LlmError::provider(format!(
                    "Failed to fetch models for {}: {}",
                    self.name, other
                )),
            }),
            Err(err) => {
                warn!(provider = %self.name, error = %err, "Model fetch failed, keeping cached list");
                Ok(self.cached_models().unwrap_or_default())
            }
        }
    }

    /// Minimal round trip to validate credentials and reachability.
    ///
    /// Uses a one-token request on a throwaway client; never errors.
    pub fn test_connection(&self, overrides: &Overrides) -> bool {
        let mut settings = self.effective_settings(overrides);
        if let Err(err) = self.check_api_key(&settings) {
            debug!(provider = %self.name, error = %err, "Connection test skipped");
            return false;
        }
        settings.max_tokens = 1;

        let client = self.build_client(settings);
        match client.complete(&[ChatMessage::user("testing connection")]) {
            Ok(_) => {
                debug!(provider = %self.name, "Connection test succeeded");
                true
            }
            Err(err) => {
                debug!(provider = %self.name, error = %err, "Connection test failed");
                false
            }
        }
    }

    /// Context window of the current model, from the cached model list
    pub fn context_window(&self) -> u64 {
        let model = self.current_model();
        self.models
            .read()
            .as_ref()
            .and_then(|models| models.iter().find(|m| m.id == model))
            .and_then(|m| m.context_length)
            .unwrap_or(DEFAULT_CONTEXT_WINDOW)
    }

    /// Models URL derived from a chat-completions style endpoint
    pub fn model_endpoint(&self, overrides: &Overrides) -> String {
        overrides
            .endpoint()
            .unwrap_or_else(|| self.base_url())
            .replace("/chat/completions", "/models")
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_client", &self.has_client())
            .finish_non_exhaustive()
    }
}

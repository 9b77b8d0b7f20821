//! Invocation facade
//!
//! The single call surface for prompt consumers. Resolves the provider,
//! translates history, and keeps track of live streaming sessions so they can
//! be interrupted.

use super::message::{build_conversation, ChatMessage};
use super::provider::Overrides;
use super::registry::{ProviderRegistry, SharedProvider};
use super::stream::{PromptStream, SessionTracker};
use crate::error::{LlmError, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Front door for blocking and streaming prompts
pub struct LlmAggregator {
    registry: ProviderRegistry,
    sessions: Arc<SessionTracker>,
}

impl LlmAggregator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            sessions: Arc::new(SessionTracker::default()),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Pick the provider a call targets and the overrides that apply.
    ///
    /// An explicit provider name wins over the active provider, except the
    /// `"Local"`/`"Default"` placeholders, which re-resolve to the active
    /// provider and discard every other override.
    pub fn resolve(&self, overrides: &Overrides) -> Result<(SharedProvider, Overrides)> {
        let (name, effective) = match overrides.provider_name() {
            Some(name) if Overrides::is_default_sentinel(name) => {
                (self.registry.active_provider_name(), Overrides::default())
            }
            Some(name) => (name.to_string(), overrides.clone()),
            None => (self.registry.active_provider_name(), overrides.clone()),
        };

        if name.trim().is_empty() {
            return Err(LlmError::configuration("No active LLM provider specified"));
        }

        let provider = self.registry.get_provider(&name).ok_or_else(|| {
            LlmError::provider(format!("Provider '{}' is not configured", name))
        })?;

        debug!(provider = %name, kind = %provider.kind(), "Resolved provider");
        Ok((provider, effective))
    }

    /// Send a prompt and block until the full response text arrives.
    ///
    /// With `history`, the prompt is appended as the final user turn.
    pub fn send_prompt(
        &self,
        prompt: &str,
        overrides: &Overrides,
        history: Option<&[ChatMessage]>,
    ) -> Result<String> {
        let (provider, overrides) = self.resolve(overrides)?;
        let client = provider.get_client(&overrides)?;
        client.complete(&build_conversation(prompt, history))
    }

    /// Start a streaming prompt.
    ///
    /// Configuration problems fail before any session opens. Once the
    /// session is open, its cleanup (deregistration and a client reset) runs
    /// on every exit path, including a failed request.
    pub fn stream_prompt(
        &self,
        prompt: &str,
        overrides: &Overrides,
        history: Option<&[ChatMessage]>,
    ) -> Result<PromptStream> {
        let (provider, overrides) = self.resolve(overrides)?;
        provider.ensure_api_key(&overrides)?;

        let guard = self.sessions.begin(Arc::clone(&provider));
        let client = provider.get_client(&overrides)?;
        let chunks = client.stream(&build_conversation(prompt, history))?;

        info!(provider = %provider.name(), model = %client.model(), "Streaming prompt");
        Ok(PromptStream::new(chunks, guard))
    }

    /// Cancel every live stream. Returns `false` (and does nothing) when no
    /// stream is active.
    pub fn interrupt(&self) -> bool {
        let signalled = self.sessions.cancel_all();
        if signalled > 0 {
            info!(sessions = signalled, "Interrupt requested");
        }
        signalled > 0
    }

    /// Whether any streaming session is open
    pub fn is_streaming(&self) -> bool {
        self.sessions.active_count() > 0
    }
}

//! Shared, mutable settings store
//!
//! The settings owner (a settings dialog, the CLI) mutates this store; the
//! provider registry only reads it through [`SettingsSource`].

use super::types::{LlmSettings, ProviderConfig};
use parking_lot::RwLock;
use std::sync::Arc;

/// Read-only view of the persisted provider configuration
pub trait SettingsSource: Send + Sync {
    /// Configuration for a provider label, if one exists
    fn provider_config(&self, name: &str) -> Option<ProviderConfig>;

    /// Label of the active provider (empty when none)
    fn active_provider_name(&self) -> String;
}

/// Cloneable handle to the process-wide LLM settings
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<LlmSettings>>,
}

impl SharedSettings {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> LlmSettings {
        self.inner.read().clone()
    }

    /// Replace the settings wholesale (e.g. after reloading from disk)
    pub fn replace(&self, settings: LlmSettings) {
        *self.inner.write() = settings;
    }

    /// Mutate the settings under the write lock
    pub fn update<R>(&self, f: impl FnOnce(&mut LlmSettings) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl SettingsSource for SharedSettings {
    fn provider_config(&self, name: &str) -> Option<ProviderConfig> {
        self.inner.read().get_provider(name).cloned()
    }

    fn active_provider_name(&self) -> String {
        self.inner.read().active_provider.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderKind;

    #[test]
    fn test_updates_visible_through_source() {
        let settings = SharedSettings::new(LlmSettings::empty());
        let source: Arc<dyn SettingsSource> = Arc::new(settings.clone());
        assert_eq!(source.active_provider_name(), "");

        settings.update(|s| {
            s.upsert_provider("Local Llama", ProviderConfig::new(ProviderKind::Ollama));
            s.set_active("Local Llama")
        });

        assert_eq!(source.active_provider_name(), "Local Llama");
        assert!(source.provider_config("Local Llama").is_some());
    }
}

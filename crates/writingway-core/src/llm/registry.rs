//! Provider registry for resolving configured providers by name

use super::kind::ProviderKind;
use super::provider::Provider;
use super::transport::{TransportFactory, UreqTransportFactory};
use crate::config::{ProviderConfig, SettingsSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared handle to a configured provider
pub type SharedProvider = Arc<Provider>;

/// Maps provider labels to live [`Provider`]s
///
/// Configuration is always read from the settings source; instantiated
/// providers are cached per label and live until the entry changes, is
/// deleted, or the cache is cleared.
pub struct ProviderRegistry {
    settings: Arc<dyn SettingsSource>,
    transports: Arc<dyn TransportFactory>,
    cache: Mutex<HashMap<String, SharedProvider>>,
}

impl ProviderRegistry {
    /// Registry backed by real HTTP transports
    pub fn new(settings: Arc<dyn SettingsSource>) -> Self {
        Self::with_transport(settings, Arc::new(UreqTransportFactory))
    }

    pub fn with_transport(
        settings: Arc<dyn SettingsSource>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            settings,
            transports,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Names of every supported provider kind
    pub fn provider_kinds() -> Vec<&'static str> {
        ProviderKind::ALL.iter().map(|kind| kind.name()).collect()
    }

    /// Build an uncached provider, e.g. to test settings before saving them.
    ///
    /// Returns `None` for an unknown kind name.
    pub fn create_provider(&self, kind_name: &str, config: ProviderConfig) -> Option<Provider> {
        let kind = ProviderKind::from_name(kind_name)?;
        Some(Provider::new(kind_name, kind, config, Arc::clone(&self.transports)))
    }

    /// Resolve a configured provider by label.
    ///
    /// `None` when the label is not configured or names an unknown kind.
    pub fn get_provider(&self, name: &str) -> Option<SharedProvider> {
        let mut cache = self.cache.lock();

        let Some(config) = self.settings.provider_config(name) else {
            if cache.remove(name).is_some() {
                debug!(provider = %name, "Provider no longer configured, evicted");
            }
            return None;
        };

        if let Some(provider) = cache.get(name) {
            if provider.config() == &config {
                return Some(Arc::clone(provider));
            }
            debug!(provider = %name, "Configuration changed, rebuilding provider");
        }

        let Some(kind) = config.kind() else {
            warn!(provider = %name, kind = %config.provider, "Unknown provider kind");
            cache.remove(name);
            return None;
        };

        debug!(provider = %name, kind = %kind, "Instantiating provider");
        let provider = Arc::new(Provider::new(
            name,
            kind,
            config,
            Arc::clone(&self.transports),
        ));
        cache.insert(name.to_string(), Arc::clone(&provider));
        Some(provider)
    }

    /// Label of the active provider (empty when none)
    pub fn active_provider_name(&self) -> String {
        self.settings.active_provider_name()
    }

    /// Labels with an instantiated provider, sorted
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop one cached provider
    pub fn invalidate(&self, name: &str) -> bool {
        self.cache.lock().remove(name).is_some()
    }

    /// Drop every cached provider
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

//! On-disk model catalog
//!
//! Keeps the last fetched model list of each provider in one JSON file so a
//! fresh process can show models without hitting the network. Entries older
//! than the TTL are ignored.

use super::models::ModelDescriptor;
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Catalog file name inside the cache directory
pub const CATALOG_FILE_NAME: &str = "model_cache.json";

/// Default freshness window
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogEntry {
    /// Seconds since the Unix epoch
    fetched_at: u64,
    models: Vec<ModelDescriptor>,
}

type CatalogFile = BTreeMap<String, CatalogEntry>;

/// JSON-file cache of model lists keyed by provider label
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    path: PathBuf,
    ttl: Duration,
}

impl ModelCatalog {
    /// Catalog stored as `model_cache.json` under `dir`
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(CATALOG_FILE_NAME),
            ttl: DEFAULT_CATALOG_TTL,
        }
    }

    /// Catalog in the user's Writingway config directory
    pub fn user_default() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(&dir.join("writingway")))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh cached models for `provider`, if any
    pub fn load(&self, provider: &str) -> Option<Vec<ModelDescriptor>> {
        let entry = self.read().remove(provider)?;
        let age = now_secs().saturating_sub(entry.fetched_at);
        if age > self.ttl.as_secs() {
            tracing::debug!(provider, age, "Model catalog entry expired");
            return None;
        }
        Some(entry.models)
    }

    /// Record `models` as the current list for `provider`
    pub fn store(&self, provider: &str, models: &[ModelDescriptor]) -> Result<(), ConfigError> {
        let mut catalog = self.read();
        catalog.insert(
            provider.to_string(),
            CatalogEntry {
                fetched_at: now_secs(),
                models: models.to_vec(),
            },
        );
        self.write(&catalog)
    }

    /// Forget the cached list of one provider
    pub fn remove(&self, provider: &str) -> Result<bool, ConfigError> {
        let mut catalog = self.read();
        if catalog.remove(provider).is_none() {
            return Ok(false);
        }
        self.write(&catalog)?;
        Ok(true)
    }

    fn write(&self, catalog: &CatalogFile) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write beside the target and rename so readers never see a torn file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(catalog)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read(&self) -> CatalogFile {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return CatalogFile::new(),
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "Ignoring unreadable model catalog");
            CatalogFile::new()
        })
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let catalog = ModelCatalog::new(dir.path());
        let models = vec![
            ModelDescriptor::new("llama3"),
            ModelDescriptor::new("mistral").with_context_length(32768),
        ];

        catalog.store("Ollama", &models).unwrap();
        assert_eq!(catalog.load("Ollama"), Some(models));
        assert_eq!(catalog.load("OpenAI"), None);
    }

    #[test]
    fn test_providers_kept_side_by_side() {
        let dir = TempDir::new().unwrap();
        let catalog = ModelCatalog::new(&dir.path().join("nested"));

        catalog.store("A", &[ModelDescriptor::new("a")]).unwrap();
        catalog.store("B", &[ModelDescriptor::new("b")]).unwrap();
        assert_eq!(catalog.load("A").unwrap()[0].id, "a");
        assert_eq!(catalog.load("B").unwrap()[0].id, "b");

        assert!(catalog.remove("A").unwrap());
        assert!(!catalog.remove("A").unwrap());
        assert_eq!(catalog.load("A"), None);
        assert!(catalog.load("B").is_some());
    }

    #[test]
    fn test_remove_replaces_file_atomically() {
        let dir = TempDir::new().unwrap();
        let catalog = ModelCatalog::new(dir.path());
        catalog.store("A", &[ModelDescriptor::new("a")]).unwrap();
        catalog.store("B", &[ModelDescriptor::new("b")]).unwrap();

        assert!(catalog.remove("A").unwrap());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(CATALOG_FILE_NAME)]);
        let content = std::fs::read_to_string(catalog.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(parsed.get("A").is_none());
        assert!(parsed.get("B").is_some());
    }

    #[test]
    fn test_expired_entry_ignored() {
        let dir = TempDir::new().unwrap();
        let catalog = ModelCatalog::new(dir.path());
        std::fs::write(
            catalog.path(),
            r#"{"OpenRouter": {"fetched_at": 0, "models": [{"id": "x", "name": "x"}]}}"#,
        )
        .unwrap();

        assert_eq!(catalog.load("OpenRouter"), None);
        let forever = catalog.with_ttl(Duration::from_secs(u64::MAX));
        assert_eq!(forever.load("OpenRouter").unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let catalog = ModelCatalog::new(dir.path());
        std::fs::write(catalog.path(), "not json").unwrap();

        assert_eq!(catalog.load("Ollama"), None);
        catalog.store("Ollama", &[ModelDescriptor::new("llama3")]).unwrap();
        assert!(catalog.load("Ollama").is_some());
    }
}

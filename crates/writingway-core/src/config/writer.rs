//! Configuration writer

use super::loader::ConfigError;
use super::types::WritingwayConfig;
use std::path::{Path, PathBuf};

/// Project-level config file name
pub const CONFIG_FILE_NAME: &str = ".writingway.toml";

/// Path of the project-level config file
pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE_NAME)
}

/// Path of the user-level config file
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("writingway").join("config.toml"))
}

/// Persist configuration as pretty TOML, creating parent directories.
pub fn save_config(config: &WritingwayConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::debug!(path = %path.display(), "saved configuration");
    Ok(())
}

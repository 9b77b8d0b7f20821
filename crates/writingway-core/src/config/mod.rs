//! Configuration module for Writingway
//!
//! Handles loading and parsing of `.writingway.toml` configuration files
//! with support for environment variable expansion.

mod loader;
mod shared;
mod types;
mod writer;

pub use loader::{load_config, load_from_file, sample_config, ConfigError};
pub use shared::{SettingsSource, SharedSettings};
pub use types::{
    LlmSettings, ProviderConfig, WritingwayConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT_SECS,
};
pub use writer::{config_path, save_config, user_config_path, CONFIG_FILE_NAME};

//! Error types for the writingway CLI using thiserror
//!
//! All errors are typed - no .unwrap() or .expect() in production code.

use thiserror::Error;
use writingway_core::config::ConfigError;
use writingway_core::LlmError;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Usage(String),

    #[error("Provider '{0}' is not configured")]
    UnknownProvider(String),

    #[error("Connection test failed for '{0}'")]
    ConnectionFailed(String),

    #[error("Failed to install Ctrl+C handler: {0}")]
    Signal(String),
}

/// Result type alias for the CLI
pub type Result<T> = std::result::Result<T, AppError>;

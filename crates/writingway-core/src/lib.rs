//! Writingway Core - LLM provider aggregation for Writingway
//!
//! This crate provides the UI-agnostic half of Writingway's LLM tooling:
//! - Provider configuration (`.writingway.toml`, env overrides)
//! - Provider kinds and their wire formats (OpenAI-compatible, Anthropic, Gemini, Ollama)
//! - A registry resolving provider labels to cached providers
//! - The invocation facade for blocking and streaming prompts
//! - A background streaming worker with cooperative cancellation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  send/stream  ┌───────────────┐  label  ┌──────────────────┐
//! │  UI / CLI    │ ─────────────→│ LlmAggregator │ ───────→│ ProviderRegistry │
//! │              │               │               │         └────────┬─────────┘
//! │              │ ←─────────────│ PromptStream  │                  │ Provider
//! └──────────────┘  WorkerEvent  └───────────────┘         (client + model cache)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use writingway_core::{LlmAggregator, Overrides, ProviderRegistry, SharedSettings};
//!
//! let settings = SharedSettings::new(config.llm);
//! let llm = LlmAggregator::new(ProviderRegistry::new(Arc::new(settings)));
//!
//! for chunk in llm.stream_prompt("Describe the harbour at dawn", &Overrides::new(), None)? {
//!     print!("{}", chunk?);
//! }
//! ```

pub mod config;
pub mod error;
pub mod llm;

pub use error::{LlmError, Result};

// Re-export config types
pub use config::{LlmSettings, ProviderConfig, SettingsSource, SharedSettings, WritingwayConfig};

// Re-export LLM types
pub use llm::{
    CancelHandle, ChatMessage, LlmAggregator, ModelCatalog, ModelDescriptor, Overrides,
    PromptStream, Provider, ProviderKind, ProviderRegistry, Role, SharedProvider,
    StreamingWorker, WorkerEvent, WorkerState,
};

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! LLM integration module
//!
//! Normalizes many LLM backends behind one provider abstraction with
//! blocking and streaming invocation, per-stream cancellation and model
//! listing.
//!
//! Supported provider kinds:
//! - OpenAI and OpenAI-compatible servers (OpenRouter, TogetherAI, LM Studio, custom)
//! - Anthropic (Messages API)
//! - Gemini (Google AI)
//! - Ollama (local inference)

mod aggregator;
mod anthropic;
mod backend;
mod catalog;
mod client;
mod gemini;
mod kind;
mod message;
mod models;
mod ollama;
mod openai;
mod provider;
mod registry;
mod stream;
mod transport;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::LlmAggregator;
pub use backend::{ProviderBackend, StreamLine};
pub use catalog::{ModelCatalog, CATALOG_FILE_NAME, DEFAULT_CATALOG_TTL};
pub use client::{ChunkStream, ClientSettings, ProviderClient};
pub use kind::ProviderKind;
pub use message::{build_conversation, ChatMessage, Role};
pub use models::{sort_models, ModelDescriptor};
pub use provider::{Overrides, Provider, DEFAULT_CONTEXT_WINDOW};
pub use registry::{ProviderRegistry, SharedProvider};
pub use stream::{CancelHandle, PromptStream};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, LineReader, Method, TransportFactory,
    UreqTransport, UreqTransportFactory,
};
pub use worker::{
    sniff_in_band_error, InBandError, StreamingWorker, WorkerEvent, WorkerState,
    AUTH_ERROR_MESSAGE,
};

// Backend implementations
pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiCompatBackend;

//! Generation collaborator capability for the Switchboard triage pipeline.
//!
//! Provides the `ProviderAdapter` trait, `DynProvider` wrapper, middleware
//! chain, `LlmClient`, and an adapter for a local Ollama backend.

mod client;
mod ollama;
mod provider;
mod types;

pub use client::{LlmClient, LoggingMiddleware, Middleware};
pub use ollama::OllamaAdapter;
pub use provider::{DynProvider, ProviderAdapter};
pub use types::{GenerationRequest, GenerationResponse, Message, Role, Usage};

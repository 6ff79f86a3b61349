use std::collections::HashMap;

use switchboard_types::{Result, TriageError};

use crate::{DynProvider, GenerationRequest, GenerationResponse, ProviderAdapter};

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub trait Middleware: Send + Sync {
    fn before(&self, _request: &mut GenerationRequest) {}
    fn after(&self, _request: &GenerationRequest, _response: &mut GenerationResponse) {}
}

// ---------------------------------------------------------------------------
// Built-in middleware: LoggingMiddleware
// ---------------------------------------------------------------------------

pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before(&self, request: &mut GenerationRequest) {
        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            structured = request.format.is_some(),
            "Generation request"
        );
    }

    fn after(&self, _request: &GenerationRequest, response: &mut GenerationResponse) {
        tracing::info!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            done = ?response.done_reason,
            "Generation response"
        );
    }
}

// ---------------------------------------------------------------------------
// LlmClient
// ---------------------------------------------------------------------------

pub struct LlmClient {
    providers: HashMap<String, DynProvider>,
    middleware: Vec<Box<dyn Middleware>>,
}

impl LlmClient {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            middleware: Vec::new(),
        }
    }

    pub fn register_provider(&mut self, provider: impl ProviderAdapter + 'static) {
        let name = provider.name().to_string();
        self.providers.insert(name, DynProvider::new(provider));
    }

    pub fn with_middleware(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(m));
        self
    }

    pub async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let provider = self.resolve_provider(request)?;
        let mut req = request.clone();

        for m in &self.middleware {
            m.before(&mut req);
        }

        let mut resp = provider.complete(&req).await?;

        for m in &self.middleware {
            m.after(&req, &mut resp);
        }

        Ok(resp)
    }

    fn resolve_provider(&self, request: &GenerationRequest) -> Result<&DynProvider> {
        if let Some(ref provider_name) = request.provider {
            return self.providers.get(provider_name).ok_or_else(|| {
                TriageError::Other(format!("Provider '{}' not registered", provider_name))
            });
        }

        if let Some(provider) = self.providers.values().next() {
            return Ok(provider);
        }

        Err(TriageError::Other("No providers registered".to_string()))
    }
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use switchboard_types::{Result, TriageError};

use crate::{GenerationRequest, GenerationResponse, ProviderAdapter, Role, Usage};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2:3b";

// ---------------------------------------------------------------------------
// OllamaAdapter
// ---------------------------------------------------------------------------

/// Adapter for a local Ollama backend (`POST /api/chat`, non-streaming).
#[derive(Debug)]
pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
    default_model: String,
    timeout: Option<Duration>,
}

impl OllamaAdapter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Deadline applied to each request. The adapter enforces no other
    /// cancellation; this is the caller's only lever.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read the base URL from `OLLAMA_HOST`, falling back to localhost.
    pub fn from_env() -> Self {
        match std::env::var("OLLAMA_HOST") {
            Ok(host) if !host.is_empty() => Self::new().with_base_url(host),
            _ => Self::new(),
        }
    }
}

impl Default for OllamaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Request translation (unified -> Ollama JSON)
// ---------------------------------------------------------------------------

fn build_request_body(request: &GenerationRequest) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .map(|m| {
            json!({
                "role": match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": m.content,
            })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "stream": false,
    });

    if let Some(temp) = request.temperature {
        body["options"] = json!({ "temperature": temp });
    }

    if let Some(ref format) = request.format {
        body["format"] = format.clone();
    }

    body
}

// ---------------------------------------------------------------------------
// Response translation (Ollama JSON -> unified GenerationResponse)
// ---------------------------------------------------------------------------

fn parse_response(body: &serde_json::Value) -> GenerationResponse {
    let text = body["message"]["content"].as_str().unwrap_or("").to_string();
    let model = body["model"].as_str().unwrap_or("").to_string();
    let done_reason = body["done_reason"].as_str().map(String::from);

    GenerationResponse {
        // Ollama responses carry no id; mint one for the audit trail.
        id: format!("gen-{}", uuid::Uuid::new_v4()),
        model,
        text,
        done_reason,
        usage: Usage {
            input_tokens: body["prompt_eval_count"].as_u64().unwrap_or(0),
            output_tokens: body["eval_count"].as_u64().unwrap_or(0),
        },
    }
}

fn status_is_retryable(status: u16) -> bool {
    status == 429 || status >= 500
}

// ---------------------------------------------------------------------------
// ProviderAdapter impl
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let body = build_request_body(request);

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(timeout) = self.timeout {
            http_request = http_request.timeout(timeout);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                TriageError::RequestTimeout {
                    provider: "ollama".into(),
                    timeout_ms: self.timeout.map(|t| t.as_millis() as u64).unwrap_or(0),
                }
            } else {
                TriageError::ProviderError {
                    provider: "ollama".into(),
                    status: 0,
                    message: e.to_string(),
                    retryable: true,
                }
            }
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TriageError::ProviderError {
                provider: "ollama".into(),
                status,
                message,
                retryable: status_is_retryable(status),
            });
        }

        let json_body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| TriageError::ProviderError {
                    provider: "ollama".into(),
                    status,
                    message: format!("invalid response body: {e}"),
                    retryable: false,
                })?;

        Ok(parse_response(&json_body))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    fn make_request() -> GenerationRequest {
        GenerationRequest::new(
            "llama3.2:3b",
            vec![
                Message::system("You classify tickets."),
                Message::user("Subject: hi"),
            ],
        )
    }

    #[test]
    fn request_body_basic_shape() {
        let body = build_request_body(&make_request());
        assert_eq!(body["model"], "llama3.2:3b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Subject: hi");
        assert!(body.get("format").is_none());
        assert!(body.get("options").is_none());
    }

    #[test]
    fn request_body_includes_temperature_and_format() {
        let req = make_request()
            .with_temperature(0.5)
            .with_format(serde_json::json!({"type": "object"}));
        let body = build_request_body(&req);
        assert_eq!(body["options"]["temperature"], 0.5);
        assert_eq!(body["format"]["type"], "object");
    }

    #[test]
    fn parse_response_extracts_text_and_usage() {
        let body = serde_json::json!({
            "model": "llama3.2:3b",
            "message": {"role": "assistant", "content": "{\"category\":\"billing\"}"},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 42,
            "eval_count": 17,
        });
        let resp = parse_response(&body);
        assert_eq!(resp.model, "llama3.2:3b");
        assert_eq!(resp.text, "{\"category\":\"billing\"}");
        assert_eq!(resp.done_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.input_tokens, 42);
        assert_eq!(resp.usage.output_tokens, 17);
        assert!(resp.id.starts_with("gen-"));
    }

    #[test]
    fn parse_response_tolerates_missing_fields() {
        let resp = parse_response(&serde_json::json!({}));
        assert_eq!(resp.text, "");
        assert_eq!(resp.usage.input_tokens, 0);
    }

    #[test]
    fn retryable_statuses() {
        assert!(status_is_retryable(429));
        assert!(status_is_retryable(500));
        assert!(status_is_retryable(503));
        assert!(!status_is_retryable(400));
        assert!(!status_is_retryable(404));
    }

    #[test]
    fn from_env_defaults_to_localhost() {
        std::env::remove_var("OLLAMA_HOST");
        let adapter = OllamaAdapter::from_env();
        assert_eq!(adapter.base_url, DEFAULT_BASE_URL);
        assert_eq!(adapter.default_model(), DEFAULT_MODEL);
    }
}

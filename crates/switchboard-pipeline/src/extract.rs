//! Resilient output extraction: three escalating strategies for turning an
//! unreliable generation call into a validated typed value.
//!
//! 1. Structured attempt — schema-constrained request, parse, validate.
//! 2. JSON-repair attempt — plain-text re-issue, first balanced `{...}`
//!    block, key repair, scale normalization (repairable contracts only).
//! 3. Safe fallback — per-contract degraded value; never raises.
//!
//! Each failed attempt is preserved as diagnostic evidence so nodes can
//! record the full recovery story in the audit trail.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use switchboard_llm::{GenerationRequest, LlmClient, Message};
use switchboard_types::{Result, TicketState, TriageError};

use crate::contract::OutputContract;

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// A structured instruction: system role text plus fixed-shape human-role
/// text with the ticket's fields already interpolated.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub system: String,
    pub user: String,
}

impl Instruction {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system.clone()),
            Message::user(self.user.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Extraction result
// ---------------------------------------------------------------------------

/// Which strategy produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Structured,
    Repaired,
    Fallback,
}

/// A validated value plus the evidence of how it was obtained.
#[derive(Debug, Clone)]
pub struct Extraction<C> {
    pub value: C,
    pub tier: Tier,
    /// Raw completion text from the repair attempt, when one was issued.
    pub raw: Option<String>,
    /// Error messages from each failed attempt, in order.
    pub attempts: Vec<String>,
}

// ---------------------------------------------------------------------------
// OutputExtractor
// ---------------------------------------------------------------------------

pub struct OutputExtractor {
    client: Arc<LlmClient>,
    model: String,
    temperature: f32,
}

impl OutputExtractor {
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    /// Run the recovery ladder for contract `C`. Short-circuits on the first
    /// success; contracts without repair/fallback propagate the first error.
    pub async fn extract<C: OutputContract>(
        &self,
        instruction: &Instruction,
        state: &TicketState,
    ) -> Result<Extraction<C>> {
        let mut attempts = Vec::new();

        match self.structured_attempt::<C>(instruction).await {
            Ok(value) => {
                return Ok(Extraction {
                    value,
                    tier: Tier::Structured,
                    raw: None,
                    attempts,
                })
            }
            Err(e) => {
                tracing::warn!(contract = C::NAME, error = %e, "Structured extraction failed");
                attempts.push(e.to_string());
                if !C::REPAIRABLE {
                    return match C::fallback(state, &e) {
                        Some(value) => Ok(Extraction {
                            value,
                            tier: Tier::Fallback,
                            raw: None,
                            attempts,
                        }),
                        None => Err(e),
                    };
                }
            }
        }

        let mut raw = None;
        match self.repair_attempt::<C>(instruction, &mut raw).await {
            Ok(value) => Ok(Extraction {
                value,
                tier: Tier::Repaired,
                raw,
                attempts,
            }),
            Err(e) => {
                tracing::warn!(contract = C::NAME, error = %e, "JSON repair failed");
                attempts.push(e.to_string());
                match C::fallback(state, &e) {
                    Some(value) => Ok(Extraction {
                        value,
                        tier: Tier::Fallback,
                        raw,
                        attempts,
                    }),
                    None => Err(e),
                }
            }
        }
    }

    /// Tier 1: ask for the contract shape directly, constrained by schema.
    async fn structured_attempt<C: OutputContract>(&self, instruction: &Instruction) -> Result<C> {
        let request = GenerationRequest::new(self.model.clone(), instruction.messages())
            .with_temperature(self.temperature)
            .with_format(C::schema());
        let response = self.client.complete(&request).await?;
        construct_and_validate::<C>(parse_json::<C>(&response.text)?)
    }

    /// Tier 2: plain-text completion, then recover the first JSON object.
    async fn repair_attempt<C: OutputContract>(
        &self,
        instruction: &Instruction,
        raw: &mut Option<String>,
    ) -> Result<C> {
        let request = GenerationRequest::new(self.model.clone(), instruction.messages())
            .with_temperature(self.temperature);
        let response = self.client.complete(&request).await?;
        let text = response.text.trim().to_string();
        *raw = Some(text.clone());

        let block = first_json_object(&text).ok_or_else(|| TriageError::MalformedOutput {
            contract: C::NAME.to_string(),
            message: "no JSON object found in completion".to_string(),
        })?;

        let mut fields = match parse_json::<C>(block)? {
            Value::Object(map) => map,
            other => {
                return Err(TriageError::MalformedOutput {
                    contract: C::NAME.to_string(),
                    message: format!("expected a JSON object, got {other}"),
                })
            }
        };

        C::repair(&mut fields);
        construct_and_validate::<C>(Value::Object(fields))
    }
}

fn parse_json<C: OutputContract>(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| TriageError::MalformedOutput {
        contract: C::NAME.to_string(),
        message: e.to_string(),
    })
}

fn construct_and_validate<C: OutputContract>(value: Value) -> Result<C> {
    let out: C = serde_json::from_value(value).map_err(|e| TriageError::ContractViolation {
        contract: C::NAME.to_string(),
        message: e.to_string(),
    })?;
    out.validate()?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// JSON block recovery
// ---------------------------------------------------------------------------

/// Return the first balanced `{...}` block in `text`: scan left-to-right for
/// the first `{`, then the `}` that balances it, skipping braces inside JSON
/// string literals.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Typed output contracts the generation collaborator must satisfy.
//!
//! Each stage of the pipeline requests one of these shapes. A contract knows
//! how to validate itself, and may additionally declare a key-repair policy
//! (applied to the raw field map recovered from free text) and a safe
//! fallback that manufactures a degraded value from ticket state alone.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use switchboard_types::{
    Category, HandlerLevel, Result, Route, TicketState, TriageError, UrgencyLevel,
};

// ---------------------------------------------------------------------------
// OutputContract
// ---------------------------------------------------------------------------

/// Capability set shared by all stage output shapes.
///
/// `schema()` is sent to the collaborator on the structured attempt;
/// `repair` and `fallback` are the optional recovery hooks for contracts
/// that tolerate malformed output.
pub trait OutputContract: DeserializeOwned + Serialize + Send + Sized {
    const NAME: &'static str;

    /// Whether the JSON-repair tier is defined for this contract.
    const REPAIRABLE: bool = false;

    /// JSON schema constraining the structured attempt.
    fn schema() -> Value;

    /// Field-level constraints serde cannot express (numeric ranges).
    fn validate(&self) -> Result<()>;

    /// Key-repair hook applied to the raw field map before construction.
    fn repair(_fields: &mut Map<String, Value>) {}

    /// Safe fallback producing a degraded value from ticket state. Contracts
    /// without one propagate the triggering error as fatal.
    fn fallback(_state: &TicketState, _err: &TriageError) -> Option<Self> {
        None
    }
}

fn enum_values(names: &[&str]) -> Value {
    json!(names)
}

fn range_error(contract: &str, field: &str, value: f64) -> TriageError {
    TriageError::ContractViolation {
        contract: contract.to_string(),
        message: format!("{field} must be within [0, 1], got {value}"),
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
    pub reason: String,
}

impl OutputContract for Classification {
    const NAME: &'static str = "classification";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": enum_values(&Category::ALL.map(|c| c.as_str())),
                },
                "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "reason": { "type": "string" },
            },
            "required": ["category", "confidence", "reason"],
        })
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(range_error(Self::NAME, "confidence", self.confidence));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UrgencyAssessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyAssessment {
    pub urgency_level: UrgencyLevel,
    pub urgency_score: f64,
    pub reason: String,
}

impl OutputContract for UrgencyAssessment {
    const NAME: &'static str = "urgency";
    const REPAIRABLE: bool = true;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "urgency_level": {
                    "type": "string",
                    "enum": enum_values(&UrgencyLevel::ALL.map(|u| u.as_str())),
                },
                "urgency_score": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "reason": { "type": "string" },
            },
            "required": ["urgency_level", "urgency_score", "reason"],
        })
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.urgency_score) {
            return Err(range_error(Self::NAME, "urgency_score", self.urgency_score));
        }
        Ok(())
    }

    fn repair(fields: &mut Map<String, Value>) {
        // Common key mistake: "urgency" instead of "urgency_level".
        if !fields.contains_key("urgency_level") {
            if let Some(v) = fields.remove("urgency") {
                fields.insert("urgency_level".to_string(), v);
            }
        }

        // Score under a typo'd or synonymous key: adopt the first match in
        // the collaborator's own key order.
        if !fields.contains_key("urgency_score") {
            let candidate = fields
                .keys()
                .find(|k| {
                    let k = k.to_ascii_lowercase();
                    k.contains("confid") || k.contains("condif") || k.contains("score")
                })
                .cloned();
            if let Some(key) = candidate {
                let v = fields[&key].clone();
                fields.insert("urgency_score".to_string(), v);
            }
        }

        // Scores on a 1..10 or 0..100 scale get normalized into [0, 1].
        if let Some(score) = fields.get("urgency_score").and_then(Value::as_f64) {
            fields.insert("urgency_score".to_string(), json!(normalize_score(score)));
        }
    }

    fn fallback(state: &TicketState, err: &TriageError) -> Option<Self> {
        let outage = state.content.to_lowercase().contains("down");
        let (urgency_level, urgency_score) = if outage {
            (UrgencyLevel::High, 0.8)
        } else {
            (UrgencyLevel::Medium, 0.5)
        };
        Some(Self {
            urgency_level,
            urgency_score,
            reason: format!("Fallback due to parsing failure: {err}"),
        })
    }
}

/// Normalize a raw score onto [0, 1]. Values in (1, 10] are treated as a
/// ten-point scale, values above 10 as a percentage capped at 1.0; the
/// result is always clamped. Idempotent on already-valid inputs.
pub fn normalize_score(score: f64) -> f64 {
    let mut s = score;
    if s > 1.0 && s <= 10.0 {
        s /= 10.0;
    }
    if s > 10.0 {
        s = (s / 100.0).min(1.0);
    }
    s.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// RoutingDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub route_to: Route,
    pub handler_level: HandlerLevel,
    pub reason: String,
}

impl OutputContract for RoutingDecision {
    const NAME: &'static str = "routing";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "route_to": {
                    "type": "string",
                    "enum": enum_values(&Route::ALL.map(|r| r.as_str())),
                },
                "handler_level": {
                    "type": "string",
                    "enum": enum_values(&HandlerLevel::ALL.map(|h| h.as_str())),
                },
                "reason": { "type": "string" },
            },
            "required": ["route_to", "handler_level", "reason"],
        })
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

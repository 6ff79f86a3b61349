//! Pipeline nodes: classify, assess urgency, route, human review.
//!
//! Each node consumes the ticket state, calls the extractor (human review
//! excepted), writes its decision slot exactly once, and appends audit
//! events describing what happened — including every degraded outcome.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use switchboard_types::{HandlerLevel, Result, Route, Step, TicketState, UrgencyLevel};

use crate::contract::{Classification, RoutingDecision, UrgencyAssessment};
use crate::extract::{Instruction, OutputExtractor, Tier};

// ---------------------------------------------------------------------------
// TriageNode
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TriageNode: Send + Sync {
    /// Audit tag for events this node records.
    fn step(&self) -> Step;

    /// Execute this node against the ticket, mutating it in place.
    async fn run(&self, state: &mut TicketState) -> Result<()>;
}

// ---------------------------------------------------------------------------
// ClassifyNode
// ---------------------------------------------------------------------------

pub struct ClassifyNode {
    extractor: Arc<OutputExtractor>,
}

impl ClassifyNode {
    pub fn new(extractor: Arc<OutputExtractor>) -> Self {
        Self { extractor }
    }

    fn instruction(state: &TicketState) -> Instruction {
        Instruction::new(
            "You classify SaaS support tickets into: billing, technical, \
             feature_request, account_management, other. \
             Return a single JSON object with keys category, confidence, reason. \
             confidence MUST be a float between 0 and 1.",
            format!(
                "Subject: {}\n\nTicket:\n{}\n\nCustomer tier: {}",
                state.subject,
                state.content,
                state.tier_or_unknown().as_str(),
            ),
        )
    }
}

#[async_trait]
impl TriageNode for ClassifyNode {
    fn step(&self) -> Step {
        Step::Classifier
    }

    async fn run(&self, state: &mut TicketState) -> Result<()> {
        let instruction = Self::instruction(state);
        let extraction = self
            .extractor
            .extract::<Classification>(&instruction, state)
            .await?;
        let out = extraction.value;

        tracing::info!(
            ticket = %state.ticket_id,
            category = out.category.as_str(),
            confidence = out.confidence,
            "Classified ticket"
        );

        state.category = Some(out.category);
        state.category_confidence = Some(out.confidence);
        state.category_reason = Some(out.reason.clone());
        state.record_event(self.step(), "Classified ticket", serde_json::to_value(&out)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UrgencyNode
// ---------------------------------------------------------------------------

pub struct UrgencyNode {
    extractor: Arc<OutputExtractor>,
}

impl UrgencyNode {
    pub fn new(extractor: Arc<OutputExtractor>) -> Self {
        Self { extractor }
    }

    fn instruction(state: &TicketState) -> Instruction {
        Instruction::new(
            "Return ONLY valid JSON with EXACT keys.\n\
             Example format (follow exactly):\n\
             {\"urgency_level\":\"low|medium|high|critical\",\
             \"urgency_score\":0.0,\
             \"reason\":\"...\"}\n\
             Rules:\n\
             - Do NOT add extra keys\n\
             - urgency_score MUST be a float between 0 and 1",
            format!(
                "Subject: {}\n\nTicket:\n{}\n\nCategory: {}\nCustomer tier: {}",
                state.subject,
                state.content,
                state
                    .category
                    .map(|c| c.as_str())
                    .unwrap_or("other"),
                state.tier_or_unknown().as_str(),
            ),
        )
    }
}

#[async_trait]
impl TriageNode for UrgencyNode {
    fn step(&self) -> Step {
        Step::Urgency
    }

    async fn run(&self, state: &mut TicketState) -> Result<()> {
        let instruction = Self::instruction(state);
        let extraction = self
            .extractor
            .extract::<UrgencyAssessment>(&instruction, state)
            .await?;

        if let Some(first_error) = extraction.attempts.first() {
            state.record_event(
                self.step(),
                "Structured parse failed; attempting JSON repair",
                json!({ "error": first_error }),
            );
        }

        let out = &extraction.value;
        state.urgency_level = Some(out.urgency_level);
        state.urgency_score = Some(out.urgency_score);
        state.urgency_reason = Some(out.reason.clone());

        tracing::info!(
            ticket = %state.ticket_id,
            urgency = out.urgency_level.as_str(),
            score = out.urgency_score,
            tier = ?extraction.tier,
            "Assessed urgency"
        );

        match extraction.tier {
            Tier::Structured => {
                state.record_event(
                    self.step(),
                    "Assessed urgency (structured)",
                    serde_json::to_value(out)?,
                );
            }
            Tier::Repaired => {
                state.record_event(
                    self.step(),
                    "Assessed urgency (repaired)",
                    json!({
                        "raw": extraction.raw,
                        "parsed": serde_json::to_value(out)?,
                    }),
                );
            }
            Tier::Fallback => {
                let error = extraction
                    .attempts
                    .last()
                    .cloned()
                    .unwrap_or_default();
                state.push_error(error.clone());
                state.record_event(
                    self.step(),
                    "Fallback urgency applied",
                    json!({ "raw": extraction.raw, "error": error }),
                );
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RouteNode
// ---------------------------------------------------------------------------

pub struct RouteNode {
    extractor: Arc<OutputExtractor>,
}

impl RouteNode {
    pub fn new(extractor: Arc<OutputExtractor>) -> Self {
        Self { extractor }
    }

    fn instruction(state: &TicketState) -> Instruction {
        Instruction::new(
            "You route SaaS support tickets. Use category + urgency to decide \
             the queue and handler level.\n\
             Allowed route_to: billing_queue, tech_support_queue, product_queue, \
             account_queue, triage_queue\n\
             Allowed handler_level: support, specialist, senior_engineer\n\n\
             Rules:\n\
             - billing -> billing_queue\n\
             - account_management -> account_queue\n\
             - feature_request -> product_queue\n\
             - technical -> tech_support_queue\n\
             - if uncertain -> triage_queue\n\
             - technical + (high|critical) -> senior_engineer\n\n\
             Return ONLY valid JSON with EXACT keys route_to, handler_level, reason. \
             No extra keys.",
            format!(
                "Subject: {}\n\nTicket:\n{}\n\nCategory: {} (conf={})\n\
                 Urgency: {} (score={})\nCustomer tier: {}",
                state.subject,
                state.content,
                state.category.map(|c| c.as_str()).unwrap_or("other"),
                state.category_confidence.unwrap_or(0.0),
                state
                    .urgency_level
                    .map(|u| u.as_str())
                    .unwrap_or(UrgencyLevel::Medium.as_str()),
                state.urgency_score.unwrap_or(0.5),
                state.tier_or_unknown().as_str(),
            ),
        )
    }
}

#[async_trait]
impl TriageNode for RouteNode {
    fn step(&self) -> Step {
        Step::Router
    }

    async fn run(&self, state: &mut TicketState) -> Result<()> {
        let instruction = Self::instruction(state);
        let extraction = self
            .extractor
            .extract::<RoutingDecision>(&instruction, state)
            .await?;
        let out = extraction.value;

        tracing::info!(
            ticket = %state.ticket_id,
            route = out.route_to.as_str(),
            handler = out.handler_level.as_str(),
            "Routed ticket"
        );

        state.route_to = Some(out.route_to);
        state.handler_level = Some(out.handler_level);
        state.routing_reason = Some(out.reason.clone());
        state.record_event(self.step(), "Routed ticket", serde_json::to_value(&out)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HumanReviewNode
// ---------------------------------------------------------------------------

/// Terminal escalation stub. A production deployment would open a review
/// task in the ticketing system and park the ticket on its id; here the
/// ticket is parked on the triage queue with a specialist.
pub struct HumanReviewNode;

#[async_trait]
impl TriageNode for HumanReviewNode {
    fn step(&self) -> Step {
        Step::HumanReview
    }

    async fn run(&self, state: &mut TicketState) -> Result<()> {
        let reason = state.review_reason.clone().unwrap_or_default();

        tracing::info!(ticket = %state.ticket_id, reason = %reason, "Escalated to human review");

        state.route_to = Some(Route::TriageQueue);
        state.handler_level = Some(HandlerLevel::Specialist);
        state.routing_reason = Some(format!("Pending human review: {reason}"));
        state.record_event(
            self.step(),
            "Routed to triage pending human review",
            json!({}),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

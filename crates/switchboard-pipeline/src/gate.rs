//! Conditional gates: pure decision functions mapping current state to the
//! next pipeline node.
//!
//! All thresholds are strict inequalities; a confidence exactly at the
//! threshold proceeds without review.

use switchboard_types::TicketState;

use crate::runner::TriageConfig;

// ---------------------------------------------------------------------------
// NodeName
// ---------------------------------------------------------------------------

/// States of the triage state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeName {
    Classify,
    Urgency,
    Route,
    HumanReview,
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

/// After classification: divert to human review when the classifier was not
/// confident enough, otherwise continue to urgency assessment.
pub fn after_classify(state: &mut TicketState, config: &TriageConfig) -> NodeName {
    let conf = state.category_confidence.unwrap_or(0.0);
    if conf < config.category_confidence_min {
        state.needs_review = true;
        state.review_reason = Some(format!(
            "Low category confidence ({:.2} < {:.2})",
            conf, config.category_confidence_min
        ));
        NodeName::HumanReview
    } else {
        NodeName::Urgency
    }
}

/// After urgency assessment: divert when the score contradicts an outage
/// keyword in the ticket text, otherwise continue to routing.
pub fn after_urgency(state: &mut TicketState, config: &TriageConfig) -> NodeName {
    let score = state.urgency_score.unwrap_or(0.0);
    if score < config.urgency_score_floor && state.content.to_lowercase().contains("down") {
        state.needs_review = true;
        state.review_reason = Some("Urgency seems inconsistent with ticket text".to_string());
        NodeName::HumanReview
    } else {
        NodeName::Route
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

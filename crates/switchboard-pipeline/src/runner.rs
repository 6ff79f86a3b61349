//! Graph runner: composes nodes and gates into a fixed traversal and
//! executes exactly one path per ticket.
//!
//! classify -> gate -> (human_review | urgency -> gate -> (human_review | route))
//!
//! Execution is single-threaded and sequential per ticket; a run holds no
//! state beyond the ticket it was given, so independent tickets may be
//! triaged concurrently against a shared client.

use std::sync::Arc;

use switchboard_llm::LlmClient;
use switchboard_types::{Result, TicketState};

use crate::extract::OutputExtractor;
use crate::gate::{after_classify, after_urgency, NodeName};
use crate::node::{ClassifyNode, HumanReviewNode, RouteNode, TriageNode, UrgencyNode};

// ---------------------------------------------------------------------------
// TriageConfig
// ---------------------------------------------------------------------------

/// Tunable policy for one runner. Thresholds live here rather than as
/// module constants so alternate policies are testable.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Model served by the generation backend.
    pub model: String,
    /// Sampling temperature for every node request.
    pub temperature: f32,
    /// Minimum classifier confidence to proceed without review.
    pub category_confidence_min: f64,
    /// Urgency scores below this, combined with an outage keyword in the
    /// ticket text, divert to review.
    pub urgency_score_floor: f64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2:3b".to_string(),
            temperature: 0.1,
            category_confidence_min: 0.70,
            urgency_score_floor: 0.20,
        }
    }
}

// ---------------------------------------------------------------------------
// TriageRunner
// ---------------------------------------------------------------------------

pub struct TriageRunner {
    config: TriageConfig,
    classify: ClassifyNode,
    urgency: UrgencyNode,
    route: RouteNode,
    review: HumanReviewNode,
}

impl TriageRunner {
    pub fn new(client: Arc<LlmClient>, config: TriageConfig) -> Self {
        let extractor = Arc::new(OutputExtractor::new(
            client,
            config.model.clone(),
            config.temperature,
        ));
        Self {
            config,
            classify: ClassifyNode::new(extractor.clone()),
            urgency: UrgencyNode::new(extractor.clone()),
            route: RouteNode::new(extractor),
            review: HumanReviewNode,
        }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Traverse the pipeline for one ticket and return its final state.
    ///
    /// A fatal extraction failure (classification or routing) aborts the run
    /// for this ticket; no partial progress is resumable.
    pub async fn run(&self, mut state: TicketState) -> Result<TicketState> {
        tracing::info!(ticket = %state.ticket_id, "Starting triage");

        let mut next = NodeName::Classify;
        loop {
            match next {
                NodeName::Classify => {
                    self.classify.run(&mut state).await?;
                    next = after_classify(&mut state, &self.config);
                }
                NodeName::Urgency => {
                    self.urgency.run(&mut state).await?;
                    next = after_urgency(&mut state, &self.config);
                }
                NodeName::Route => {
                    self.route.run(&mut state).await?;
                    break;
                }
                NodeName::HumanReview => {
                    self.review.run(&mut state).await?;
                    break;
                }
            }
            tracing::debug!(ticket = %state.ticket_id, next = ?next, "Gate selected next node");
        }

        tracing::info!(
            ticket = %state.ticket_id,
            route = ?state.route_to,
            needs_review = state.needs_review,
            "Triage complete"
        );
        Ok(state)
    }
}

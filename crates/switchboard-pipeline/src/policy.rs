//! Standalone review policy.
//!
//! A broader escalation predicate than the inline gates: usable for a
//! post-hoc audit pass over already-triaged tickets. Kept deliberately
//! separate from the gates — the two encode overlapping but non-identical
//! triggers and are maintained as independent checks.

use switchboard_types::{CustomerTier, TicketState, UrgencyLevel};

use crate::runner::TriageConfig;

/// Returns a reason when the ticket should be escalated to human review:
/// low classification confidence, or high urgency for an important customer.
pub fn should_review(state: &TicketState, config: &TriageConfig) -> Option<String> {
    let conf = state.category_confidence.unwrap_or(0.0);
    if conf < config.category_confidence_min {
        return Some(format!("Low category confidence ({conf:.2})"));
    }

    if let (Some(urgency), Some(tier)) = (state.urgency_level, state.customer_tier) {
        if matches!(urgency, UrgencyLevel::High | UrgencyLevel::Critical)
            && matches!(tier, CustomerTier::Pro | CustomerTier::Enterprise)
        {
            return Some(format!(
                "High urgency ({}) for {} customer",
                urgency.as_str(),
                tier.as_str()
            ));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Triage pipeline core: output contracts, resilient extraction, nodes,
//! gates, review policy, and the graph runner.
//!
//! One ticket at a time flows through classify -> gate -> (urgency -> gate
//! -> route | human review). Each node extracts a typed judgment from the
//! generation collaborator through a three-tier recovery ladder (structured
//! parse, JSON repair, safe fallback) and appends to the ticket's audit trail.

pub mod contract;
pub mod extract;
pub mod gate;
pub mod node;
pub mod policy;
pub mod retry;
pub mod runner;

pub use contract::{
    normalize_score, Classification, OutputContract, RoutingDecision, UrgencyAssessment,
};
pub use extract::{first_json_object, Extraction, Instruction, OutputExtractor, Tier};
pub use gate::{after_classify, after_urgency, NodeName};
pub use node::{ClassifyNode, HumanReviewNode, RouteNode, TriageNode, UrgencyNode};
pub use policy::should_review;
pub use retry::{retry_with_backoff, BackoffPolicy};
pub use runner::{TriageConfig, TriageRunner};

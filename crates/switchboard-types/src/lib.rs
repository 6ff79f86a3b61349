//! Shared types, errors, and ticket state for the Switchboard triage pipeline.
//!
//! This crate provides the foundational types used across all other Switchboard crates:
//! - `TriageError` — unified error taxonomy
//! - domain enums — `Category`, `UrgencyLevel`, `Route`, `HandlerLevel`, `CustomerTier`, `Channel`
//! - `TicketState` — the mutable record threaded through one pipeline run
//! - `TicketEvent` — append-only audit trail entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TriageError
// ---------------------------------------------------------------------------

/// Unified error type for all Switchboard subsystems.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    // === Generation collaborator errors ===
    #[error("Provider {provider} returned HTTP {status}: {message}")]
    ProviderError {
        provider: String,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    RequestTimeout { provider: String, timeout_ms: u64 },

    // === Extraction errors ===
    #[error("Malformed {contract} output: {message}")]
    MalformedOutput { contract: String, message: String },

    #[error("{contract} violates its contract: {message}")]
    ContractViolation { contract: String, message: String },

    // === Ticket errors ===
    #[error("Required ticket field '{field}' is empty")]
    EmptyField { field: String },

    // === Retry helper ===
    #[error("Retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: usize },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TriageError {
    /// Returns `true` if the error is transient and the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TriageError::RequestTimeout { .. }
                | TriageError::ProviderError {
                    retryable: true,
                    ..
                }
        )
    }

    /// Returns `true` if the error is permanent and retrying will not help.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TriageError::ContractViolation { .. } | TriageError::EmptyField { .. }
        )
    }
}

/// A convenience alias for `Result<T, TriageError>`.
pub type Result<T> = std::result::Result<T, TriageError>;

// ---------------------------------------------------------------------------
// Domain enums
// ---------------------------------------------------------------------------

/// Ticket category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Billing,
    Technical,
    FeatureRequest,
    AccountManagement,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Billing,
        Category::Technical,
        Category::FeatureRequest,
        Category::AccountManagement,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Billing => "billing",
            Category::Technical => "technical",
            Category::FeatureRequest => "feature_request",
            Category::AccountManagement => "account_management",
            Category::Other => "other",
        }
    }
}

/// Urgency level assigned by the urgency assessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub const ALL: [UrgencyLevel; 4] = [
        UrgencyLevel::Low,
        UrgencyLevel::Medium,
        UrgencyLevel::High,
        UrgencyLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        }
    }
}

/// Destination queue chosen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    BillingQueue,
    TechSupportQueue,
    ProductQueue,
    AccountQueue,
    TriageQueue,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::BillingQueue,
        Route::TechSupportQueue,
        Route::ProductQueue,
        Route::AccountQueue,
        Route::TriageQueue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::BillingQueue => "billing_queue",
            Route::TechSupportQueue => "tech_support_queue",
            Route::ProductQueue => "product_queue",
            Route::AccountQueue => "account_queue",
            Route::TriageQueue => "triage_queue",
        }
    }
}

/// Handler seniority chosen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerLevel {
    Support,
    Specialist,
    SeniorEngineer,
}

impl HandlerLevel {
    pub const ALL: [HandlerLevel; 3] = [
        HandlerLevel::Support,
        HandlerLevel::Specialist,
        HandlerLevel::SeniorEngineer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerLevel::Support => "support",
            HandlerLevel::Specialist => "specialist",
            HandlerLevel::SeniorEngineer => "senior_engineer",
        }
    }
}

/// Commercial tier of the customer who filed the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    Free,
    Premium,
    Enterprise,
    Pro,
    Unknown,
}

impl CustomerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTier::Free => "free",
            CustomerTier::Premium => "premium",
            CustomerTier::Enterprise => "enterprise",
            CustomerTier::Pro => "pro",
            CustomerTier::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for CustomerTier {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(CustomerTier::Free),
            "premium" => Ok(CustomerTier::Premium),
            "enterprise" => Ok(CustomerTier::Enterprise),
            "pro" => Ok(CustomerTier::Pro),
            "unknown" => Ok(CustomerTier::Unknown),
            other => Err(TriageError::Other(format!(
                "unknown customer tier '{other}'"
            ))),
        }
    }
}

/// Channel the ticket arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Chat,
    Web,
    Api,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Chat => "chat",
            Channel::Web => "web",
            Channel::Api => "api",
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "chat" => Ok(Channel::Chat),
            "web" => Ok(Channel::Web),
            "api" => Ok(Channel::Api),
            other => Err(TriageError::Other(format!("unknown channel '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

/// Which pipeline step produced an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Classifier,
    Urgency,
    Router,
    HumanReview,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Classifier => "classifier",
            Step::Urgency => "urgency",
            Step::Router => "router",
            Step::HumanReview => "human_review",
        }
    }
}

/// One immutable audit trail entry. Consumers read these for observability
/// only; routing logic never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketEvent {
    pub ts: DateTime<Utc>,
    pub step: Step,
    pub message: String,
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// TicketState
// ---------------------------------------------------------------------------

/// The mutable record threaded through one pipeline run.
///
/// One instance per ticket, mutated in place by each node visited, never
/// shared across tickets, never persisted beyond the run. Each decision slot
/// is written exactly once by its owning node; the human-review node may
/// write only the routing slot, which is still unset on the review path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketState {
    pub ticket_id: String,
    pub subject: String,
    pub content: String,
    pub customer_id: Option<String>,
    pub customer_tier: Option<CustomerTier>,
    pub channel: Option<Channel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Classification slot
    pub category: Option<Category>,
    pub category_confidence: Option<f64>,
    pub category_reason: Option<String>,

    // Urgency slot
    pub urgency_level: Option<UrgencyLevel>,
    pub urgency_score: Option<f64>,
    pub urgency_reason: Option<String>,

    // Routing slot
    pub route_to: Option<Route>,
    pub handler_level: Option<HandlerLevel>,
    pub routing_reason: Option<String>,

    // Review metadata
    pub needs_review: bool,
    pub review_reason: Option<String>,

    pub events: Vec<TicketEvent>,
    pub errors: Vec<String>,
}

impl TicketState {
    /// Create a fresh state for one ticket. Fails if any required field is empty.
    pub fn new(
        ticket_id: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self> {
        let ticket_id = ticket_id.into();
        let subject = subject.into();
        let content = content.into();

        for (field, value) in [
            ("ticket_id", &ticket_id),
            ("subject", &subject),
            ("content", &content),
        ] {
            if value.trim().is_empty() {
                return Err(TriageError::EmptyField {
                    field: field.to_string(),
                });
            }
        }

        let now = Utc::now();
        Ok(Self {
            ticket_id,
            subject,
            content,
            customer_id: None,
            customer_tier: None,
            channel: None,
            created_at: now,
            updated_at: now,
            category: None,
            category_confidence: None,
            category_reason: None,
            urgency_level: None,
            urgency_score: None,
            urgency_reason: None,
            route_to: None,
            handler_level: None,
            routing_reason: None,
            needs_review: false,
            review_reason: None,
            events: Vec::new(),
            errors: Vec::new(),
        })
    }

    pub fn with_customer_tier(mut self, tier: CustomerTier) -> Self {
        self.customer_tier = Some(tier);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Append an audit event and refresh `updated_at`. Events are never
    /// mutated after append; insertion order is the causal order of execution.
    pub fn record_event(
        &mut self,
        step: Step,
        message: impl Into<String>,
        data: serde_json::Value,
    ) {
        let now = Utc::now();
        self.events.push(TicketEvent {
            ts: now,
            step,
            message: message.into(),
            data,
        });
        self.updated_at = now;
    }

    /// Append an error description. Only the degraded/fallback paths do this.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Customer tier, defaulting to `unknown` when the caller supplied none.
    pub fn tier_or_unknown(&self) -> CustomerTier {
        self.customer_tier.unwrap_or(CustomerTier::Unknown)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> TicketState {
        TicketState::new("TCK-1", "Charged twice", "Two charges this month").unwrap()
    }

    // --- TriageError ---

    #[test]
    fn error_display_provider_error() {
        let err = TriageError::ProviderError {
            provider: "ollama".into(),
            status: 500,
            message: "internal server error".into(),
            retryable: true,
        };
        assert_eq!(
            err.to_string(),
            "Provider ollama returned HTTP 500: internal server error"
        );
    }

    #[test]
    fn error_display_contract_violation() {
        let err = TriageError::ContractViolation {
            contract: "urgency".into(),
            message: "urgency_score out of range".into(),
        };
        assert_eq!(
            err.to_string(),
            "urgency violates its contract: urgency_score out of range"
        );
    }

    #[test]
    fn retryable_provider_error_when_flagged() {
        let err = TriageError::ProviderError {
            provider: "x".into(),
            status: 503,
            message: "unavailable".into(),
            retryable: true,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn not_retryable_provider_error_when_not_flagged() {
        let err = TriageError::ProviderError {
            provider: "x".into(),
            status: 400,
            message: "bad request".into(),
            retryable: false,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn retryable_request_timeout() {
        let err = TriageError::RequestTimeout {
            provider: "x".into(),
            timeout_ms: 5000,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn terminal_contract_violation() {
        let err = TriageError::ContractViolation {
            contract: "classification".into(),
            message: "bad".into(),
        };
        assert!(err.is_terminal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: TriageError = json_err.into();
        assert!(matches!(err, TriageError::Json(_)));
    }

    // --- Domain enums ---

    #[test]
    fn category_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&Category::FeatureRequest).unwrap(),
            "\"feature_request\""
        );
        assert_eq!(
            serde_json::to_string(&Category::AccountManagement).unwrap(),
            "\"account_management\""
        );
        let back: Category = serde_json::from_str("\"billing\"").unwrap();
        assert_eq!(back, Category::Billing);
    }

    #[test]
    fn unknown_category_rejected() {
        assert!(serde_json::from_str::<Category>("\"spam\"").is_err());
    }

    #[test]
    fn route_and_handler_level_round_trip() {
        for route in Route::ALL {
            let json = serde_json::to_string(&route).unwrap();
            assert_eq!(json, format!("\"{}\"", route.as_str()));
            let back: Route = serde_json::from_str(&json).unwrap();
            assert_eq!(back, route);
        }
        for level in HandlerLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            let back: HandlerLevel = serde_json::from_str(&json).unwrap();
            assert_eq!(back, level);
        }
    }

    #[test]
    fn customer_tier_from_str() {
        assert_eq!(
            "enterprise".parse::<CustomerTier>().unwrap(),
            CustomerTier::Enterprise
        );
        assert_eq!("PRO".parse::<CustomerTier>().unwrap(), CustomerTier::Pro);
        assert!("platinum".parse::<CustomerTier>().is_err());
    }

    #[test]
    fn channel_from_str() {
        assert_eq!("email".parse::<Channel>().unwrap(), Channel::Email);
        assert!("fax".parse::<Channel>().is_err());
    }

    #[test]
    fn step_serialization() {
        assert_eq!(
            serde_json::to_string(&Step::HumanReview).unwrap(),
            "\"human_review\""
        );
        assert_eq!(Step::Classifier.as_str(), "classifier");
    }

    // --- TicketState ---

    #[test]
    fn new_state_starts_empty() {
        let state = ticket();
        assert_eq!(state.ticket_id, "TCK-1");
        assert!(state.events.is_empty());
        assert!(state.errors.is_empty());
        assert!(state.category.is_none());
        assert!(state.urgency_level.is_none());
        assert!(state.route_to.is_none());
        assert!(!state.needs_review);
        assert_eq!(state.created_at, state.updated_at);
    }

    #[test]
    fn new_state_rejects_empty_required_fields() {
        assert!(matches!(
            TicketState::new("", "subject", "content"),
            Err(TriageError::EmptyField { field }) if field == "ticket_id"
        ));
        assert!(matches!(
            TicketState::new("TCK-1", "   ", "content"),
            Err(TriageError::EmptyField { field }) if field == "subject"
        ));
        assert!(matches!(
            TicketState::new("TCK-1", "subject", ""),
            Err(TriageError::EmptyField { field }) if field == "content"
        ));
    }

    #[test]
    fn builder_setters() {
        let state = ticket()
            .with_customer_tier(CustomerTier::Pro)
            .with_channel(Channel::Email)
            .with_customer_id("CUST-9");
        assert_eq!(state.customer_tier, Some(CustomerTier::Pro));
        assert_eq!(state.channel, Some(Channel::Email));
        assert_eq!(state.customer_id.as_deref(), Some("CUST-9"));
    }

    #[test]
    fn tier_defaults_to_unknown() {
        assert_eq!(ticket().tier_or_unknown(), CustomerTier::Unknown);
        assert_eq!(
            ticket()
                .with_customer_tier(CustomerTier::Free)
                .tier_or_unknown(),
            CustomerTier::Free
        );
    }

    #[test]
    fn record_event_appends_in_order() {
        let mut state = ticket();
        state.record_event(Step::Classifier, "first", serde_json::json!({"a": 1}));
        state.record_event(Step::Urgency, "second", serde_json::json!({}));
        state.record_event(Step::Router, "third", serde_json::json!(null));

        let steps: Vec<Step> = state.events.iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![Step::Classifier, Step::Urgency, Step::Router]);
        assert_eq!(state.events[0].message, "first");
        assert_eq!(state.events[0].data, serde_json::json!({"a": 1}));
        assert!(state.updated_at >= state.created_at);
    }

    #[test]
    fn push_error_accumulates() {
        let mut state = ticket();
        state.push_error("first failure");
        state.push_error("second failure");
        assert_eq!(state.errors, vec!["first failure", "second failure"]);
    }

    #[test]
    fn state_serializes_round_trip() {
        let mut state = ticket().with_customer_tier(CustomerTier::Enterprise);
        state.category = Some(Category::Technical);
        state.category_confidence = Some(0.92);
        state.record_event(Step::Classifier, "Classified ticket", serde_json::json!({}));

        let json = serde_json::to_string(&state).unwrap();
        let back: TicketState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ticket_id, "TCK-1");
        assert_eq!(back.category, Some(Category::Technical));
        assert_eq!(back.category_confidence, Some(0.92));
        assert_eq!(back.events.len(), 1);
    }
}

//! CLI binary for triaging a single support ticket.

use std::sync::Arc;

use clap::Parser;

use switchboard_llm::{LlmClient, LoggingMiddleware, OllamaAdapter};
use switchboard_pipeline::{TriageConfig, TriageRunner};
use switchboard_types::{Channel, CustomerTier, TicketState};

#[derive(Parser)]
#[command(
    name = "switchboard",
    version,
    about = "Confidence-gated triage pipeline for SaaS support tickets"
)]
struct Cli {
    /// Ticket identifier
    #[arg(long, default_value = "TCK-0001")]
    ticket_id: String,

    /// Ticket subject line
    #[arg(long)]
    subject: String,

    /// Ticket body text
    #[arg(long)]
    content: String,

    /// Customer tier: free, premium, enterprise, pro
    #[arg(long)]
    tier: Option<CustomerTier>,

    /// Channel the ticket arrived on: email, chat, web, api
    #[arg(long)]
    channel: Option<Channel>,

    /// Model served by the Ollama backend
    #[arg(long, default_value = "llama3.2:3b")]
    model: String,

    /// Base URL of the Ollama backend
    #[arg(long, default_value = "http://localhost:11434")]
    base_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut state = TicketState::new(&cli.ticket_id, &cli.subject, &cli.content)?;
    if let Some(tier) = cli.tier {
        state = state.with_customer_tier(tier);
    }
    if let Some(channel) = cli.channel {
        state = state.with_channel(channel);
    }

    let mut client = LlmClient::new().with_middleware(LoggingMiddleware);
    client.register_provider(OllamaAdapter::new().with_base_url(&cli.base_url));

    let config = TriageConfig {
        model: cli.model,
        ..TriageConfig::default()
    };
    let runner = TriageRunner::new(Arc::new(client), config);
    let final_state = runner.run(state).await?;

    println!("\n--- FINAL DECISION ---");
    println!(
        "category: {} (confidence={})",
        final_state
            .category
            .map(|c| c.as_str())
            .unwrap_or("-"),
        final_state
            .category_confidence
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".into()),
    );
    println!(
        "urgency: {} (score={})",
        final_state
            .urgency_level
            .map(|u| u.as_str())
            .unwrap_or("-"),
        final_state
            .urgency_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into()),
    );
    println!(
        "route_to: {}",
        final_state.route_to.map(|r| r.as_str()).unwrap_or("-")
    );
    println!(
        "handler_level: {}",
        final_state
            .handler_level
            .map(|h| h.as_str())
            .unwrap_or("-")
    );
    if final_state.needs_review {
        println!(
            "needs_review: yes ({})",
            final_state.review_reason.as_deref().unwrap_or("")
        );
    }

    println!("\n--- ROUTING REASON ---");
    println!("{}", final_state.routing_reason.as_deref().unwrap_or("-"));

    if !final_state.errors.is_empty() {
        println!("\n--- ERRORS ---");
        for error in &final_state.errors {
            println!("{error}");
        }
    }

    println!("\n--- EVENTS ---");
    for event in &final_state.events {
        println!(
            "[{}] {} -> {}",
            event.step.as_str(),
            event.message,
            serde_json::to_string(&event.data)?
        );
    }

    Ok(())
}

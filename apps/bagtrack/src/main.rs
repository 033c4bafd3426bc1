//! # Bagtrack - Baggage Checkpoint Tracker
//!
//! The main binary for the Bagtrack checkpoint tracking service.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) for scanners and dashboards
//! - CLI interface for registering bags, recording scans and reading status
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                apps/bagtrack (THE BINARY)             │
//! │                                                       │
//! │   ┌─────────────┐    ┌─────────────┐   ┌──────────┐   │
//! │   │    CLI      │    │  HTTP API   │   │  Config  │   │
//! │   │   (clap)    │    │   (axum)    │   │  (toml)  │   │
//! │   └──────┬──────┘    └──────┬──────┘   └────┬─────┘   │
//! │          └──────────────────┼───────────────┘         │
//! │                             ▼                         │
//! │                   ┌──────────────────┐                │
//! │                   │  bagtrack-core   │                │
//! │                   │   (THE LOGIC)    │                │
//! │                   └──────────────────┘                │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! bagtrack server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! bagtrack register --tag AA123456 --flight AA100
//! bagtrack scan <bag-id> security-check --location "Gate B"
//! bagtrack status <bag-id>
//! ```

use bagtrack::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // BAGTRACK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("BAGTRACK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bagtrack=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐ BAGTRACK v{}
  │▣│ checkpoint tracking
  └─┘
"#,
        env!("CARGO_PKG_VERSION")
    );
}

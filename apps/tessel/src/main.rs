//! # Tessel - Property Graph CLI
//!
//! The main binary for the tessel graph engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/tessel (THE BINARY)           │
//! │                                               │
//! │  ┌─────────────┐        ┌─────────────────┐   │
//! │  │   CLI       │        │  tessel.toml    │   │
//! │  │  (clap)     │        │  (settings)     │   │
//! │  └──────┬──────┘        └────────┬────────┘   │
//! │         └───────────┬────────────┘            │
//! │                     ▼                         │
//! │             ┌───────────────┐                 │
//! │             │  tessel-core  │                 │
//! │             │ (THE ENGINE)  │                 │
//! │             └───────────────┘                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! tessel create '{"title": "hello"}'
//! tessel link 1 knows 2 --weight 0.5
//! tessel edges --subject 1 --predicate knows
//! tessel --codec snappy nodes --batch 50
//! ```

use clap::Parser;
use tessel::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments first: --quiet changes the default filter
    let cli = cli::Cli::parse();

    // Initialize tracing: TESSEL_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TESSEL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.quiet {
        "tessel=warn,tessel_core=warn"
    } else {
        "tessel=info,tessel_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // stdout carries command output; logs go to stderr
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

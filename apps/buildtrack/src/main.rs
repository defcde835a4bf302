//! # Buildtrack
//!
//! Command-line and HTTP shell for the Buildtrack step tracker.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │             apps/buildtrack (THE BINARY)          │
//! │                                                   │
//! │     ┌─────────────┐          ┌─────────────┐      │
//! │     │    CLI      │          │  HTTP API   │      │
//! │     │   (clap)    │          │   (axum)    │      │
//! │     └──────┬──────┘          └──────┬──────┘      │
//! │            └───────────┬────────────┘             │
//! │                        ▼                          │
//! │               ┌─────────────────┐                 │
//! │               │ buildtrack-core │                 │
//! │               │   (THE LOGIC)   │                 │
//! │               └─────────────────┘                 │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Walk the track
//! buildtrack stages
//! buildtrack show 01
//! buildtrack record 01 --file screenshot.png
//! buildtrack status 01 error
//!
//! # Finish
//! buildtrack proof
//! buildtrack submit --lovable <url> --github <url> --deploy <url>
//!
//! # Start the HTTP server
//! buildtrack server --host 0.0.0.0 --port 8080
//! ```

use buildtrack::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // BUILDTRACK_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("BUILDTRACK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "buildtrack=info,buildtrack_core=info,tower_http=debug".into());

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
  ================================
   BUILDTRACK  v{}
   Sequential step tracker
  ================================
"#,
        env!("CARGO_PKG_VERSION")
    );
}

//! Swift API demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                ┌──────────────────────── swift-api ─────────────────────────┐
//!     POST /api/greet       │  ┌────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!     ──────────────────────┼─▶│ server │──▶│ request  │──▶│   body   │──▶│ schema   │  │
//!                           │  │ (axum) │   │normalize │   │accumulate│   │ validate │  │
//!                           │  └────────┘   └──────────┘   └──────────┘   └────┬─────┘  │
//!                           │                                                  ▼        │
//!     {success, data}       │  ┌────────┐                                 ┌──────────┐  │
//!     ◀─────────────────────┼──│envelope│◀────────────────────────────────│ handler  │  │
//!                           │  └────────┘                                 └──────────┘  │
//!                           └───────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use swift_api::config::{load_config, ApiConfig};
use swift_api::demo;
use swift_api::http::ApiServer;
use swift_api::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "swift-api")]
#[command(about = "Serve the demo API", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the configuration).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ApiConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!("swift-api v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let mut server = ApiServer::with_config(demo::api(), config.server.clone());
    demo::register(&mut server)?;

    server
        .listen_with(args.port, |addr| {
            tracing::info!(address = %addr, "Listening on port {}", addr.port());
        })
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

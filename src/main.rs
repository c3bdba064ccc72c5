//! darkwatch - Maritime dark-activity monitor
//!
//! Tracks AIS telemetry across configured hot zones and flags transponder
//! dropouts and sustained ship-to-ship proximity in real time.
//!
//! # Usage
//!
//! ```bash
//! # Run against the built-in simulated fleet
//! cargo run --release
//!
//! # Run against a live AIS TCP feed
//! cargo run --release -- --live feed.example.net:9010
//!
//! # Stream the simulated fleet over TCP (separate terminal), then attach
//! cargo run --release --bin feed-sim
//! cargo run --release -- --live 127.0.0.1:9010
//! ```
//!
//! # Environment Variables
//!
//! - `DARKWATCH_CONFIG`: Path to a TOML config file
//! - `DARKWATCH_CORS_ORIGINS`: Comma-separated allowed CORS origins
//! - `RUST_LOG`: Logging level (default: info)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use darkwatch::aggregate::{HeuristicEvaluator, LogReporter};
use darkwatch::api::{create_app, ApiState};
use darkwatch::feed::{AisTcpSource, SimulatedFeed};
use darkwatch::storage::SledZoneStore;
use darkwatch::{MaritimeMonitor, MonitorConfig};

#[derive(Parser, Debug)]
#[command(name = "darkwatch")]
#[command(about = "Maritime dark-activity monitor")]
#[command(version)]
struct CliArgs {
    /// Connect to a live AIS TCP feed instead of the simulated fleet
    /// Example: --live feed.example.net:9010
    #[arg(long, value_name = "HOST:PORT")]
    live: Option<String>,

    /// Override the HTTP server address (default from config, "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML config file (overrides DARKWATCH_CONFIG)
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => MonitorConfig::load_from_file(std::path::Path::new(path))
            .with_context(|| format!("failed to load config from {path}"))?,
        None => MonitorConfig::load(),
    };
    let server_addr = args.addr.clone().unwrap_or_else(|| config.server.addr.clone());

    info!("darkwatch maritime monitor starting");
    info!(
        zones = config.zones.len(),
        dropout_minutes = config.detection.dropout_minutes,
        proximity_nm = config.detection.proximity_distance_nm,
        "configuration loaded"
    );

    let db = sled::open(&config.storage.data_dir)
        .with_context(|| format!("failed to open data dir {}", config.storage.data_dir))?;
    let zone_store = Box::new(SledZoneStore::open(&db)?);

    let monitor = Arc::new(
        MaritimeMonitor::new(
            config.clone(),
            zone_store,
            Arc::new(HeuristicEvaluator),
            Arc::new(LogReporter),
        )
        .await?,
    );

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received Ctrl+C, initiating shutdown");
        shutdown_token.cancel();
    });

    match &args.live {
        Some(addr) => {
            let (host, port_str) = addr
                .rsplit_once(':')
                .context("invalid feed address, expected HOST:PORT")?;
            let port: u16 = port_str.parse().context("invalid port number")?;
            info!(feed = %addr, "input: live AIS TCP feed");
            monitor
                .start(AisTcpSource::new(host, port, &config.feed.api_key))
                .await?;
        }
        None => {
            info!("input: simulated fleet");
            monitor.start(SimulatedFeed::new()).await?;
        }
    }

    let app = create_app(ApiState {
        monitor: Arc::clone(&monitor),
    });
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("failed to bind to {server_addr}"))?;
    info!(addr = %server_addr, "HTTP control surface listening");

    let serve_token = cancel_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            serve_token.cancelled().await;
            info!("HTTP server received shutdown signal");
        })
        .await
        .context("HTTP server error")?;

    monitor.stop().await;
    info!("shutdown complete");
    Ok(())
}

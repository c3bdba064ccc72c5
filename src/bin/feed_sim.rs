//! feed-sim - stream the simulated fleet over TCP
//!
//! Serves the same newline-delimited JSON protocol the live source speaks,
//! so the monitor can be exercised end to end without upstream access:
//!
//! ```bash
//! cargo run --bin feed-sim -- --addr 127.0.0.1:9010
//! darkwatch --live 127.0.0.1:9010
//! ```
//!
//! Each client connection gets an independent fleet. The first inbound line
//! is treated as the subscription request and acknowledged by starting the
//! stream; its content is not interpreted.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use darkwatch::feed::{FeedEvent, FeedSource, SimulatedFeed};

#[derive(Parser, Debug)]
#[command(name = "feed-sim")]
#[command(about = "Simulated AIS feed server")]
#[command(version)]
struct CliArgs {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:9010")]
    addr: String,

    /// Seconds between movement ticks
    #[arg(long, default_value = "5")]
    tick_secs: u64,
}

async fn serve_client(stream: TcpStream, tick_secs: u64) -> Result<()> {
    let peer = stream.peer_addr().context("peer address")?;
    info!(%peer, "client connected");

    let mut reader = BufReader::new(stream);
    let mut subscription = String::new();
    reader
        .read_line(&mut subscription)
        .await
        .context("reading subscription line")?;
    info!(%peer, "subscription received, streaming fleet");

    let mut feed = SimulatedFeed::new()
        .with_tick_interval(tokio::time::Duration::from_secs(tick_secs));
    feed.subscribe(&[]).await.map_err(anyhow::Error::from)?;

    let stream = reader.get_mut();
    loop {
        match feed.next_message().await? {
            FeedEvent::Message(message) => {
                let mut line = serde_json::to_string(&message)?;
                line.push('\n');
                if stream.write_all(line.as_bytes()).await.is_err() {
                    info!(%peer, "client disconnected");
                    return Ok(());
                }
            }
            FeedEvent::Eof => return Ok(()),
        }
    }
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
    let listener = TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("failed to bind to {}", args.addr))?;
    info!(addr = %args.addr, "simulated AIS feed listening");

    loop {
        let (stream, _) = listener.accept().await.context("accept failed")?;
        let tick_secs = args.tick_secs;
        tokio::spawn(async move {
            if let Err(e) = serve_client(stream, tick_secs).await {
                warn!(error = %e, "client handler failed");
            }
        });
    }
}

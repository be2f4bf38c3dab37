//! Serves the in-memory notes API for local load-test runs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use notes_stub_api::{config::StubConfig, router::Router, server::Server, store::NotesStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the stub server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Request body read timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// Status returned by /healthz
    #[arg(long, default_value_t = 204)]
    health_status: u16,

    /// Delay /healthz responses by this many milliseconds
    #[arg(long, default_value_t = 0)]
    health_delay_ms: u64,

    /// Leave `id` out of note creation responses
    #[arg(long)]
    omit_note_id: bool,

    /// Leave ETag headers off note responses
    #[arg(long)]
    omit_etag: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(StubConfig {
        request_timeout_ms: args.request_timeout_ms,
        health_status: args.health_status,
        health_delay_ms: args.health_delay_ms,
        omit_note_id: args.omit_note_id,
        omit_etag: args.omit_etag,
        ..Default::default()
    });
    let router = Router::new(Arc::new(NotesStore::new()), config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid listen address")?;
    let server = Server::bind(addr, router)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!("Starting stub notes server...");
    println!("  Host: {}", args.host);
    println!("  Port: {}", args.port);
    println!("  Request timeout: {} ms", args.request_timeout_ms);
    if args.omit_note_id || args.omit_etag || args.health_status != 204 || args.health_delay_ms > 0
    {
        println!(
            "  Faults: omit_note_id={} omit_etag={} health_status={} health_delay_ms={}",
            args.omit_note_id, args.omit_etag, args.health_status, args.health_delay_ms
        );
    }

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            tracing::error!("Server error: {}", e);
        }
    });

    signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c")?;
    println!("\nShutting down server...");
    server_handle.abort();

    Ok(())
}

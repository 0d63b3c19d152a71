//! promsqlite-server — Prometheus remote-storage adapter on SQLite.
//!
//! Decodes remote-write/remote-read bodies, serializes writes through a
//! single consumer, and answers range queries from the samples table.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use promsqlite::{Storage, WriteSerializer};
use promsqlite_server::{AppState, router, shutdown_signal};
use tracing_subscriber::EnvFilter;

/// promsqlite-server — Prometheus remote-storage adapter on SQLite.
#[derive(Parser)]
#[command(name = "promsqlite-server", version, about)]
struct Cli {
    /// Address and port to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Path to the SQLite database file.
    #[arg(long, default_value = "timeseries.sqlite")]
    db: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("application startup");

    // The writer's connection also bootstraps the schema up front, so the
    // first read request never races table creation.
    let storage = Storage::open(&cli.db)?;
    let writer = Arc::new(WriteSerializer::spawn(storage));

    let state = AppState {
        writer: Arc::clone(&writer),
        db_path: cli.db,
    };

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    tracing::info!("listening on {}", cli.listen);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Graceful serve has finished every in-flight handler, so the router's
    // state clones are gone and this is the last reference. Drain the
    // consumer: anything acknowledged before the signal still commits.
    match Arc::into_inner(writer) {
        Some(writer) => writer.shutdown(),
        None => tracing::warn!("write serializer still shared at exit, skipping drain"),
    }

    tracing::info!("shutdown complete");
    Ok(())
}

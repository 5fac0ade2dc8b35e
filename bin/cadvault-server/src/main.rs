//! cadvault-server – entry point.
//!
//! Startup order:
//! 1. Parse the command line and configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database (running migrations) and the blob store.
//! 4. Either run a one-off maintenance command or build the Axum router and
//!    serve HTTP with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use cadvault_core::{Library, LocalBlobStore, SqliteStore};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "cadvault-server", version, about = "CAD model library server")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Delete pending imports older than the given age, then exit.
    PurgePending {
        #[arg(long, default_value_t = 60)]
        older_than_minutes: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env()?;

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "cadvault-server starting");

    // ── 3. Storage ─────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url)
        .await
        .with_context(|| format!("opening database {}", cfg.database_url))?;
    let blobs = LocalBlobStore::open(&cfg.storage_dir, &cfg.public_url)
        .await
        .with_context(|| format!("opening storage dir {}", cfg.storage_dir.display()))?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg, store, blobs).await,
        Command::PurgePending { older_than_minutes } => {
            purge(store, blobs, older_than_minutes).await
        }
    }
}

fn init_tracing(cfg: &Config) {
    // RUST_LOG wins; otherwise CADVAULT_LOG, warning loudly if it is not a
    // valid filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: CADVAULT_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn serve(cfg: Config, store: SqliteStore, blobs: LocalBlobStore) -> anyhow::Result<()> {
    let http = reqwest::Client::builder()
        .timeout(cfg.fetch_timeout)
        .build()
        .context("building HTTP client")?;
    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("invalid CADVAULT_BIND {}", cfg.bind_address))?;

    let state = Arc::new(AppState::new(cfg, store, blobs, http));
    let app = routes::build(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("cadvault-server stopped");
    Ok(())
}

async fn purge(store: SqliteStore, blobs: LocalBlobStore, older_than_minutes: u32) -> anyhow::Result<()> {
    let library = Library::new(Arc::new(store), Arc::new(blobs));
    let purged = library
        .purge_pending(chrono::Duration::minutes(i64::from(older_than_minutes)))
        .await?;
    for id in &purged {
        println!("{id}");
    }
    info!(purged = purged.len(), "purge finished");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}

//! herbtrace-ledger - harvest traceability ledger service
//!
//! Accepts herb collection events over HTTP, stamps each with a batch id,
//! a location check and a herb identification, and stores them in SQLite.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use herbtrace_common::config::{ensure_directory_exists, resolve_root_folder, TomlConfig};
use herbtrace_common::db::init_database;
use herbtrace_ledger::db::{InMemoryEventRepository, SqliteEventRepository};
use herbtrace_ledger::domain::{CollectionEventStore, EventRepository, SimulatedVerifier};
use herbtrace_ledger::logging::{init_tracing, select_log_filter};
use herbtrace_ledger::{build_router, AppState};
use tokio::signal;
use tracing::info;

/// Command-line arguments for herbtrace-ledger
#[derive(Parser, Debug)]
#[command(name = "herbtrace-ledger")]
#[command(about = "Traceability ledger for medicinal herb harvest events")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "HERBTRACE_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "HERBTRACE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HERBTRACE_PORT")]
    port: Option<u16>,

    /// Keep events in memory only; nothing is written to disk
    #[arg(long)]
    in_memory: bool,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, env = "HERBTRACE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    let mut log_filter = init_tracing(&select_log_filter(
        rust_log.as_deref(),
        args.log_level.as_deref(),
        None,
    ));

    // Build identification first, before any database work
    info!(
        "Starting HerbTrace Ledger v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    log_filter.set_filter(&select_log_filter(
        rust_log.as_deref(),
        args.log_level.as_deref(),
        config.log_level.as_deref(),
    ));
    info!(filter = log_filter.active(), "Logging configured");

    let (repository, pool): (Arc<dyn EventRepository>, _) = if args.in_memory {
        info!("Running with in-memory storage; events are lost on exit");
        (Arc::new(InMemoryEventRepository::new()), None)
    } else {
        let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
        ensure_directory_exists(&root_folder).context("Failed to create data folder")?;

        let db_path = config.database_path(&root_folder);
        info!("Database path: {}", db_path.display());

        let pool = init_database(&db_path, &config.database)
            .await
            .context("Failed to initialize database")?;
        info!("✓ Database ready");

        let repository = SqliteEventRepository::new(pool.clone(), config.database.max_lock_wait_ms);
        (Arc::new(repository), Some(pool))
    };

    let verifier = SimulatedVerifier::new(
        Duration::from_millis(config.verification.latency_ms),
        config.verification.mismatch_probability,
    );
    let store = CollectionEventStore::new(repository, Arc::new(verifier))
        .with_verification_timeout(Duration::from_millis(config.verification.timeout_ms));

    let state = AppState::new(Arc::new(store), pool.clone(), config.pagination.clone());
    let app = build_router(state, &config.cors_origins);

    let host = args.host.unwrap_or_else(|| config.host.clone());
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("herbtrace-ledger listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(pool) = pool {
        pool.close().await;
        info!("Database connections closed");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

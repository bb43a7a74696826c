//! CampusFix REST API Server
//!
//! Serves the lifecycle engine over HTTP for the web client. Notifications
//! and creation records go through the background dispatcher.

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use campusfix::issue_log::JsonlIssueLog;
use campusfix::{IssueStore, JsonFileStorage, LifecycleEngine};
use campusfix_dispatch::{DispatchConfig, Dispatcher};

#[derive(Parser)]
#[command(name = "campusfix-server")]
#[command(about = "REST API for the CampusFix maintenance tracker")]
struct Args {
    /// Data directory created by `campusfix init`
    #[arg(long, env = "CAMPUSFIX_DATA_DIR", default_value = ".campusfix")]
    data_dir: PathBuf,

    /// Listen address (overrides [server] bind in config.toml)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    info!("Starting CampusFix API Server...");

    let storage = JsonFileStorage::new(&args.data_dir);
    storage.ping().map_err(|e| {
        anyhow::anyhow!(
            "Failed to initialize storage: {}\n\n\
             The server requires an initialized CampusFix data directory.\n\
             Run 'campusfix init' first, or set CAMPUSFIX_DATA_DIR to point to an existing one.",
            e
        )
    })?;
    info!("Using CampusFix data at: {}", args.data_dir.display());

    let dispatch_config = DispatchConfig::load(&args.data_dir)?;
    let issue_log = JsonlIssueLog::new(args.data_dir.join("data/issue_log.jsonl"));
    let dispatcher = Dispatcher::from_config(&dispatch_config, Arc::new(issue_log))?;
    let handle = dispatcher.handle();

    let engine = LifecycleEngine::open(storage)
        .context("Failed to load config.toml")?
        .with_notifier(Arc::new(handle.clone()))
        .with_issue_log(Arc::new(handle));
    let addr = args.bind.unwrap_or_else(|| engine.config().bind_address());

    // Build CORS layer for the browser client
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", campusfix_server::create_routes(Arc::new(engine)))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let report = dispatcher.shutdown().await;
    info!(delivered = report.delivered, failed = report.failed, "dispatcher drained");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

//! # Benchmark API Server
//!
//! Runs the HTTP API, the request-log publisher and the job worker.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin benchmark-server
//!
//! # Run with a specific environment
//! BENCH_ENV=production cargo run --bin benchmark-server
//! ```

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use benchmark_api::config::ConfigManager;
use benchmark_api::database::DatabaseConnection;
use benchmark_api::logging;
use benchmark_api::messaging::start_log_publisher;
use benchmark_api::web::{create_app, state::AppState};
use benchmark_api::worker::WorkerHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = ConfigManager::load().context("Failed to load configuration")?;
    let config = Arc::new(manager.config().clone());

    logging::init_structured_logging(&config.logging);

    info!("🚀 Starting Benchmark API Server...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "   Build Mode: {}",
        if cfg!(debug_assertions) {
            "Debug"
        } else {
            "Release"
        }
    );
    info!("   Environment: {}", manager.environment());

    let db = DatabaseConnection::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    if config.database.run_migrations {
        db.migrate().await.context("Failed to apply migrations")?;
        info!("   Migrations: applied");
    }

    let (log_publisher, log_drain) = start_log_publisher(&config.logs, db.pool())
        .await
        .context("Failed to start request log sink")?;

    let worker = config
        .worker
        .enabled
        .then(|| WorkerHandle::spawn(db.pool().clone(), &config.worker));

    let state = AppState::new(config.clone(), db.pool().clone(), log_publisher);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    info!("🎉 Benchmark API listening on {}", config.server.bind_address);
    if config.server.docs_enabled {
        info!("   Docs: http://{}/docs", config.server.bind_address);
    }
    info!("   Worker: {}", if worker.is_some() { "running" } else { "disabled" });
    info!("   Press Ctrl+C to shutdown gracefully");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("🛑 HTTP server stopped, shutting down background tasks...");

    if let Some(worker) = worker {
        worker.stop().await;
        info!("✅ Job worker stopped");
    }

    // The router (and every publisher clone) is gone, so the drain ends on its own
    if let Some(drain) = log_drain {
        if let Err(e) = drain.await {
            warn!("Request log drain ended abnormally: {}", e);
        }
    }

    db.close().await;
    info!("👋 Benchmark API Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}

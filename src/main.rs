//! Arxiver Server
//!
//! Serves arXiv search, topic feeds with cached thumbnails, saved papers and
//! avatar uploads.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;

use arxiver_server::config::Config;
use arxiver_server::state::AppState;
use arxiver_server::{db, routes, storage, telemetry};

/// How long in-flight background thumbnail batches get after the listener stops
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    telemetry::init(&config.log);

    tracing::info!("Starting Arxiver Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        provider = ?config.storage.provider,
        bucket = %config.storage.bucket,
        "Content store configured"
    );

    let store = storage::connect(&config.storage)
        .await
        .context("Failed to initialize content store")?;

    let db_pool = db::create_pool(&config.database.url, 5)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database.url);

    let app_state =
        AppState::new(config.clone(), store, db_pool).context("Failed to build app state")?;
    let app = routes::build_router(app_state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;
    tracing::info!("Arxiver Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    app_state.thumbnails().shutdown(SHUTDOWN_GRACE).await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

//! Ledger API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # In-memory ledger with default configuration
//! cargo run --bin ledger-api
//!
//! # PostgreSQL-backed ledger
//! LEDGER_DATABASE_URL=postgres://... LEDGER_JWT_SECRET=... cargo run --bin ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `LEDGER_HOST` - Server host (default: 0.0.0.0)
//! * `LEDGER_PORT` - Server port (default: 8080)
//! * `LEDGER_JWT_SECRET` - JWT signing secret (required in production)
//! * `LEDGER_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `LEDGER_DATABASE_URL` - PostgreSQL connection string; in-memory store when unset
//! * `LEDGER_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `LEDGER_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `LEDGER_JSON_LOGS` - Emit JSON log lines (default: false)
//! * `LEDGER_REQUIRE_PERIOD` - Refuse postings outside any period (default: true)
//! * `LEDGER_REJECT_INACTIVE_ACCOUNTS` - Refuse postings to inactive accounts (default: true)

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use infra_db::{create_pool, run_migrations, DatabaseConfig, InMemoryLedgerStore, PostgresLedgerStore};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid LEDGER_* configuration")?;

    init_tracing(&config.log_level, config.json_logs);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        require_period = config.require_period,
        "Starting ledger API server"
    );

    let state = build_state(config.clone()).await?;
    let app = create_router(state);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Chooses the ledger store: PostgreSQL when a URL is configured, memory otherwise
async fn build_state(config: ApiConfig) -> anyhow::Result<AppState> {
    match config.database_url.clone() {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(
                DatabaseConfig::new(url).max_connections(config.database_max_connections),
            )
            .await
            .context("failed to connect to PostgreSQL")?;

            run_migrations(&pool).await.context("failed to apply migrations")?;
            tracing::info!("Database ready");

            Ok(AppState::new(PostgresLedgerStore::new(pool), config))
        }
        None => {
            tracing::warn!("LEDGER_DATABASE_URL not set, ledger data lives in memory only");
            Ok(AppState::new(InMemoryLedgerStore::new(), config))
        }
    }
}

/// Initializes the tracing subscriber; `RUST_LOG` overrides `log_level`
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM so in-flight requests can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

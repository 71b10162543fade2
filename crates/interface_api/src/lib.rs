//! HTTP API Layer
//!
//! This crate exposes the ledger over REST using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource (accounts, periods, journal entries, batches, ledger)
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: request bodies with `validator` rules, response bodies built from aggregates
//! - **Error Handling**: ledger error kinds mapped onto HTTP status codes
//! - **Telemetry**: posting counters exported in Prometheus text format
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(InMemoryLedgerStore::new(), config);
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod telemetry;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{HealthCheckable, UuidV7Generator};
use domain_ledger::{LedgerService, LedgerStore, PostingEngine, TracingEventSink};

use crate::config::ApiConfig;
use crate::handlers::{accounts, batches, health, journal, ledger, periods};
use crate::middleware::{audit_middleware, auth_middleware};
use crate::telemetry::PrometheusMetrics;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
    pub health: Arc<dyn HealthCheckable>,
    pub metrics: Arc<PrometheusMetrics>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires a ledger service over `store` using the configured posting policy
    pub fn new<S>(store: S, config: ApiConfig) -> Self
    where
        S: LedgerStore + HealthCheckable,
    {
        let store = Arc::new(store);
        let metrics = Arc::new(PrometheusMetrics::new());
        let engine = PostingEngine::new(metrics.clone(), config.posting_policy());
        let service = LedgerService::new(
            store.clone(),
            engine,
            Arc::new(UuidV7Generator),
            Arc::new(TracingEventSink),
        );

        Self {
            service: Arc::new(service),
            health: store,
            metrics,
            config,
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Ledger service, health probe and configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let account_routes = Router::new()
        .route("/", post(accounts::create_account).get(accounts::list_accounts))
        .route("/:id", get(accounts::get_account).put(accounts::update_account))
        .route("/:id/activate", post(accounts::activate_account))
        .route("/:id/deactivate", post(accounts::deactivate_account))
        .route("/:id/ledger", get(accounts::account_ledger));

    let period_routes = Router::new()
        .route("/", post(periods::create_period).get(periods::list_periods))
        .route("/:id", get(periods::get_period).put(periods::update_period))
        .route("/:id/close", post(periods::close_period))
        .route("/:id/reopen", post(periods::reopen_period));

    let journal_routes = Router::new()
        .route("/", post(journal::create_entry))
        .route("/:id", get(journal::get_entry).put(journal::update_entry))
        .route("/:id/lines", post(journal::add_line))
        .route("/:id/approve", post(journal::approve_entry))
        .route("/:id/reject", post(journal::reject_entry))
        .route("/:id/post", post(journal::post_entry))
        .route("/:id/reverse", post(journal::reverse_entry))
        .route("/:id/reversing-entry", post(journal::create_reversing_entry))
        .route("/:id/ledger", get(journal::entry_ledger));

    let batch_routes = Router::new()
        .route("/", post(batches::create_batch))
        .route("/:id", get(batches::get_batch))
        .route("/:id/entries", post(batches::add_entry))
        .route("/:id/approve", post(batches::approve_batch))
        .route("/:id/reject", post(batches::reject_batch))
        .route("/:id/post", post(batches::post_batch))
        .route("/:id/reverse", post(batches::reverse_batch));

    let ledger_routes = Router::new()
        .route("/rows/:id", put(ledger::annotate_row))
        .route("/trial-balance", get(ledger::trial_balance))
        .route("/metrics", get(ledger::metrics));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/accounts", account_routes)
        .nest("/periods", period_routes)
        .nest("/journal-entries", journal_routes)
        .nest("/batches", batch_routes)
        .nest("/ledger", ledger_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

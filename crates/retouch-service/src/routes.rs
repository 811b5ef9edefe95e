//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{credits, edits, health, payments, projects, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for authenticated API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Credits (JWT auth)
/// - `GET /v1/credits/balance` - Get current balance
/// - `GET /v1/credits/entries` - List ledger entries
///
/// ## Projects (JWT auth)
/// - `POST /v1/projects` - Create a project from an uploaded image
/// - `GET /v1/projects` - List projects
/// - `GET /v1/projects/{id}` - Get a project with its chain head
/// - `GET /v1/projects/{id}/versions` - List the version chain
/// - `POST /v1/projects/{id}/edits` - Submit an AI edit
///
/// ## Jobs (JWT auth)
/// - `GET /v1/jobs/{id}` - Get edit job status
///
/// ## Payments (JWT auth)
/// - `GET /v1/payments/packages` - List credit packages
/// - `POST /v1/payments/orders` - Create an order and pay URL
/// - `GET /v1/payments/orders` - List orders
/// - `POST /v1/payments/orders/{out_trade_no}/retry` - Re-issue pay URL
///
/// ## Webhooks (signature verification)
/// - `GET|POST /webhooks/epay` - Payment gateway notification
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/entries", get(credits::list_entries))
        // Projects and edits
        .route("/projects", post(projects::create_project))
        .route("/projects", get(projects::list_projects))
        .route("/projects/:id", get(projects::get_project))
        .route("/projects/:id/versions", get(projects::list_versions))
        .route("/projects/:id/edits", post(edits::submit_edit))
        // Jobs
        .route("/jobs/:id", get(edits::get_job))
        // Payments
        .route("/payments/packages", get(payments::list_packages))
        .route("/payments/orders", post(payments::create_order))
        .route("/payments/orders", get(payments::list_orders))
        .route(
            "/payments/orders/:out_trade_no/retry",
            post(payments::retry_order),
        )
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - delivery is controlled by the gateway)
        .route(
            "/webhooks/epay",
            get(webhooks::epay_notify_get).post(webhooks::epay_notify_post),
        )
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

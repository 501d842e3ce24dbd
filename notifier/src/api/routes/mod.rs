//! API route modules.

pub mod metrics;
pub mod notify;
pub mod status;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes, `/metrics` included.
pub fn create_router(state: AppState) -> Router {
    api_routes(state.clone())
        .merge(metrics::router())
        .with_state(state)
}

/// API routes without `/metrics`, for when metrics are served elsewhere.
pub fn create_api_router(state: AppState) -> Router {
    api_routes(state.clone()).with_state(state)
}

/// Standalone `/metrics` router.
pub fn create_metrics_router(state: AppState) -> Router {
    metrics::router().with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/api/notify", notify::router(state))
        .nest("/api/status", status::router())
}

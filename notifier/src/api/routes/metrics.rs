//! Prometheus scrape endpoint.

use axum::{
    Router,
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
};

use crate::api::server::AppState;
use crate::metrics::PrometheusExporter;

const CONTENT_TYPE_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(export))
}

async fn export(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .stats
        .clone()
        .map(|stats| PrometheusExporter::new(stats).export())
        .unwrap_or_default();
    ([(CONTENT_TYPE, CONTENT_TYPE_TEXT)], body)
}

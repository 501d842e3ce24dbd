//! API server setup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Request;
use axum::http::HeaderName;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::auth::TokenVerifier;
use crate::api::routes;
use crate::collector::Registry;
use crate::delivery::{DeliveryStats, Notifier};
use crate::error::{Error, Result};
use crate::gateway::REQUEST_ID_HEADER;
use crate::template::TemplateRegistry;

fn parse_address(address: &str) -> Result<SocketAddr> {
    address
        .parse()
        .map_err(|e| Error::config(format!("Invalid address {address}: {e}")))
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub start_time: Instant,
    pub registry: Arc<Registry>,
    pub templates: Arc<dyn TemplateRegistry>,
    pub notifier: Arc<dyn Notifier>,
    pub verifier: Arc<TokenVerifier>,
    /// Delivery counters, when the notifier keeps them.
    pub stats: Option<Arc<DeliveryStats>>,
}

impl AppState {
    pub fn new(
        registry: Arc<Registry>,
        templates: Arc<dyn TemplateRegistry>,
        notifier: Arc<dyn Notifier>,
        verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            registry,
            templates,
            notifier,
            verifier,
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: Arc<DeliveryStats>) -> Self {
        self.stats = Some(stats);
        self
    }
}

/// HTTP front end of the notification service.
pub struct ApiServer {
    address: String,
    /// Separate listener for `/metrics`; `None` serves it on `address`.
    metrics_address: Option<String>,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(address: impl Into<String>, state: AppState) -> Self {
        Self {
            address: address.into(),
            metrics_address: None,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Serve `/metrics` on its own address. The same address as the API is a no-op.
    pub fn with_metrics_address(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        self.metrics_address = (address != self.address).then_some(address);
        self
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(state: AppState) -> Router {
        Self::with_layers(routes::create_router(state))
    }

    fn with_layers(router: Router) -> Router {
        let request_id = HeaderName::from_static("x-request-id");
        router
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request| {
                        let request_id = req
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default();
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id,
                        )
                    })
                    .on_response(
                        |res: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                            tracing::info!(
                                status = res.status().as_u16(),
                                latency_ms = latency.as_millis() as u64,
                                "finished processing request"
                            );
                        },
                    ),
            )
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// Start the server and serve until cancelled.
    pub async fn run(&self) -> Result<()> {
        let addr = parse_address(&self.address)?;
        let router = match &self.metrics_address {
            Some(metrics_address) => {
                let metrics_addr = parse_address(metrics_address)?;
                let listener = TcpListener::bind(metrics_addr).await?;
                tracing::info!("Metrics listening on http://{}/metrics", metrics_addr);
                let metrics = routes::create_metrics_router(self.state.clone());
                let cancel_token = self.cancel_token.clone();
                tokio::spawn(async move {
                    let result = axum::serve(listener, metrics)
                        .with_graceful_shutdown(cancel_token.cancelled_owned())
                        .await;
                    if let Err(e) = result {
                        tracing::error!(error = %e, "metrics server failed");
                    }
                });
                Self::with_layers(routes::create_api_router(self.state.clone()))
            }
            None => Self::build_router(self.state.clone()),
        };

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("API server listening on http://{}", addr);

        let cancel_token = self.cancel_token.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await?;

        Ok(())
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::CallbackNotifier;
    use crate::template::EmbeddedTemplates;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(
            Arc::new(Registry::new()),
            Arc::new(EmbeddedTemplates::load().unwrap()),
            Arc::new(CallbackNotifier::new(|_, _| {})),
            Arc::new(TokenVerifier::from_secret("secret")),
        )
        .with_stats(Arc::new(DeliveryStats::new()))
    }

    #[test]
    fn test_metrics_address_on_api_address_is_shared() {
        let server = ApiServer::new("0.0.0.0:8080", state()).with_metrics_address("0.0.0.0:8080");
        assert!(server.metrics_address.is_none());

        let server = ApiServer::new("0.0.0.0:8080", state()).with_metrics_address("0.0.0.0:9090");
        assert_eq!(server.metrics_address.as_deref(), Some("0.0.0.0:9090"));
    }

    #[tokio::test]
    async fn test_api_router_without_metrics() {
        let request = || {
            axum::http::Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap()
        };

        let api = routes::create_api_router(state());
        let response = api.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let metrics = routes::create_metrics_router(state());
        let response = metrics.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_invalid_address() {
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_address("127.0.0.1:8080").is_ok());
    }
}

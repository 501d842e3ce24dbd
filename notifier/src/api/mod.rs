//! HTTP API.
//!
//! - `POST /api/notify` queues a notification (bearer token required)
//! - `GET /api/notify/types` lists notification types
//! - `GET /api/status` reports uptime and delivery counters
//! - `GET /metrics` exports delivery counters for Prometheus

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;

pub use auth::{Claims, TokenVerifier};
pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, AppState};

//! Notification trigger routes.

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::auth::require_token;
use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::collector::CustomAttributes;
use crate::context::RequestContext;
use crate::delivery::Notification;
use crate::types::NotificationType;

/// Create the notify router.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(notify))
        .route_layer(middleware::from_fn_with_state(state, require_token))
        .route("/types", get(list_types))
}

/// JSON:API resource type of the request body.
const RESOURCE_TYPE: &str = "notifications";

/// JSON:API request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyPayload {
    pub data: NotifyData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyData {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: NotifyAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyAttributes {
    /// Notification type key, e.g. `workitem.update`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Subject id handed to the resolver.
    pub id: String,
    #[serde(default)]
    pub custom: Option<CustomAttributes>,
}

/// Queue a notification for delivery.
async fn notify(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<NotifyPayload>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(payload) = payload?;
    if payload.data.kind != RESOURCE_TYPE {
        return Err(ApiError::bad_parameter("data.type", &payload.data.kind));
    }
    let attributes = payload.data.attributes;
    let kind: NotificationType = attributes.kind.parse()?;

    let notifiers = state.registry.notifiers(kind);
    if !notifiers.is_empty() && !ctx.is_service_account(&notifiers) {
        warn!(
            notification_type = %kind,
            service_account = ctx.actor().and_then(|a| a.service_account.as_deref()),
            "caller is not allowed to send this notification"
        );
        return Err(ApiError::unauthorized(format!(
            "not authorized to send {kind} notifications"
        )));
    }

    let custom = attributes.custom.unwrap_or_default();
    if let Some(validator) = state.registry.validator(kind) {
        validator(&ctx, &custom)?;
    }

    let template = state
        .templates
        .get(kind)
        .ok_or_else(|| ApiError::bad_parameter("data.attributes.type", kind.as_str()))?;
    let resolver = state.registry.get(kind).ok_or_else(|| {
        ApiError::internal(format!("no receiver resolver registered for {kind}"))
    })?;

    let notification =
        Notification::new(kind, attributes.id, resolver, template).with_custom_attributes(custom);
    info!(
        notification_type = %kind,
        id = %notification.id,
        request_id = ctx.request_id(),
        "accepted notification"
    );
    state.notifier.send(ctx, notification).await?;

    Ok(StatusCode::ACCEPTED)
}

/// Summary of a notification type.
#[derive(Debug, Serialize)]
pub struct NotificationTypeResponse {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub label: &'static str,
    pub notifiers: Vec<String>,
    pub enabled: bool,
}

/// List every notification type and whether it can be sent.
async fn list_types(State(state): State<AppState>) -> Json<Vec<NotificationTypeResponse>> {
    let types = NotificationType::ALL
        .into_iter()
        .map(|kind| NotificationTypeResponse {
            kind,
            label: kind.label(),
            notifiers: state.registry.notifiers(kind),
            enabled: state.registry.get(kind).is_some() && state.templates.get(kind).is_some(),
        })
        .collect();
    Json(types)
}

//! HTTP surface tests driven through the full router.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use notifier::api::{ApiServer, AppState, TokenVerifier};
use notifier::collector::default_registry;
use notifier::context::RequestContext;
use notifier::delivery::{CallbackNotifier, DeliveryStats, Notification};
use notifier::template::EmbeddedTemplates;
use notifier::test_utils::{FakeGateway, sign_token};
use notifier::types::NotificationType;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test-secret-key-32-chars-long!!";
const USER_ID: &str = "2e0698d8-753e-4cef-bb7c-f027634824a2";
const WORK_ITEM_ID: &str = "8bccc228-bba7-43ad-b077-15fbb9148f7f";

type Received = Arc<Mutex<Vec<(RequestContext, Notification)>>>;

fn app() -> (axum::Router, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let notifier = {
        let received = received.clone();
        CallbackNotifier::new(move |ctx, n| received.lock().push((ctx, n)))
    };
    let state = AppState::new(
        Arc::new(default_registry(
            Arc::new(FakeGateway::new()),
            "https://openshift.io",
        )),
        Arc::new(EmbeddedTemplates::load().unwrap()),
        Arc::new(notifier),
        Arc::new(TokenVerifier::from_secret(SECRET)),
    )
    .with_stats(Arc::new(DeliveryStats::new()));
    (ApiServer::build_router(state), received)
}

fn user_token() -> String {
    sign_token(SECRET, Some(USER_ID), Some("jane@example.com"), None)
}

fn notify_request(token: Option<&str>, attributes: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/notify")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = json!({"data": {"type": "notifications", "attributes": attributes}});
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_notify_accepted() {
    let (app, received) = app();
    let request = notify_request(
        Some(&user_token()),
        json!({"type": "workitem.update", "id": WORK_ITEM_ID}),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.headers().contains_key("x-request-id"));

    let received = received.lock();
    assert_eq!(received.len(), 1);
    let (ctx, notification) = &received[0];
    assert_eq!(notification.kind, NotificationType::WorkItemUpdate);
    assert_eq!(notification.id, WORK_ITEM_ID);
    assert_eq!(ctx.actor_email(), Some("jane@example.com"));
    assert!(ctx.request_id().is_some());
}

#[tokio::test]
async fn test_notify_forwards_request_id() {
    let (app, received) = app();
    let mut request = notify_request(
        Some(&user_token()),
        json!({"type": "comment.create", "id": WORK_ITEM_ID}),
    );
    request
        .headers_mut()
        .insert("x-request-id", "req-123".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(received.lock()[0].0.request_id(), Some("req-123"));
}

#[tokio::test]
async fn test_notify_requires_token() {
    let (app, received) = app();
    let request = notify_request(None, json!({"type": "workitem.update", "id": WORK_ITEM_ID}));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(received.lock().is_empty());
}

#[tokio::test]
async fn test_notify_rejects_foreign_signature() {
    let (app, _) = app();
    let token = sign_token("some-other-secret-of-enough-size", Some(USER_ID), None, None);
    let request = notify_request(
        Some(&token),
        json!({"type": "workitem.update", "id": WORK_ITEM_ID}),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_notify_unknown_type() {
    let (app, received) = app();
    let request = notify_request(
        Some(&user_token()),
        json!({"type": "workitem.delete", "id": WORK_ITEM_ID}),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "BAD_PARAMETER");
    assert_eq!(body["details"]["parameter"], "data.attributes.type");
    assert!(received.lock().is_empty());
}

#[tokio::test]
async fn test_notify_malformed_body() {
    let (app, received) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/notify")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", user_token()))
        .body(Body::from("{\"data\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().starts_with("Malformed payload"));
    assert!(received.lock().is_empty());
}

#[tokio::test]
async fn test_notify_wrong_resource_type() {
    let (app, received) = app();
    let body = json!({
        "data": {
            "type": "workitems",
            "attributes": {"type": "workitem.update", "id": WORK_ITEM_ID}
        }
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/notify")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", user_token()))
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"]["parameter"], "data.type");
    assert_eq!(body["details"]["value"], "workitems");
    assert!(received.lock().is_empty());
}

#[tokio::test]
async fn test_email_update_requires_auth_service_account() {
    let (app, received) = app();
    let request = notify_request(
        Some(&user_token()),
        json!({"type": "user.email.update", "id": USER_ID, "custom": {"verifyURL": "https://v"}}),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(received.lock().is_empty());
}

#[tokio::test]
async fn test_email_update_requires_verify_url() {
    let (app, received) = app();
    let token = sign_token(SECRET, None, None, Some("fabric8-auth"));
    let request = notify_request(
        Some(&token),
        json!({"type": "user.email.update", "id": USER_ID}),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"]["parameter"], "data.attributes.custom.verifyURL");
    assert!(received.lock().is_empty());
}

#[tokio::test]
async fn test_email_update_accepted_from_auth_service() {
    let (app, received) = app();
    let token = sign_token(SECRET, None, None, Some("fabric8-auth"));
    let request = notify_request(
        Some(&token),
        json!({"type": "user.email.update", "id": USER_ID, "custom": {"verifyURL": "https://v"}}),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let received = received.lock();
    assert_eq!(received[0].1.custom_attributes["verifyURL"], "https://v");
}

#[tokio::test]
async fn test_list_types_is_public() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/api/notify/types")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let types = body.as_array().unwrap();
    assert_eq!(types.len(), NotificationType::ALL.len());

    let email = types
        .iter()
        .find(|t| t["type"] == "user.email.update")
        .unwrap();
    assert_eq!(email["notifiers"], json!(["fabric8-auth"]));
    assert_eq!(email["enabled"], true);
}

#[tokio::test]
async fn test_status() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/api/status")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["delivery"]["submitted"], 0);
}

#[tokio::test]
async fn test_metrics_scrape() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("notifier_notifications_submitted_total 0\n"));
    assert!(text.contains("notifier_notifications_delivered_total{outcome=\"sent\"} 0\n"));
}

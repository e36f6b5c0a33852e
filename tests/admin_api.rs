mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sapphire_led::config::Settings;
use serde_json::json;

use common::{app, app_with, get, send, RecordingNotifier};

const TOKEN: &str = "s3cret-admin";

fn with_token() -> Settings {
    Settings {
        admin_token: Some(TOKEN.into()),
        ..Settings::default()
    }
}

fn authorized(method: &str, uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn admin_api_is_closed_without_configured_token() {
    let app = app(RecordingNotifier::configured());

    let (status, body) = send(&app, authorized("GET", "/api/admin/leads", TOKEN, Body::empty())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "ok": false, "error": "unauthorized" }));
}

#[tokio::test]
async fn missing_or_wrong_token_is_rejected() {
    let app = app_with(with_token(), RecordingNotifier::configured());

    let (status, _) = send(&app, get("/api/admin/leads")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, authorized("GET", "/api/admin/leads", "s3cret-admix", Body::empty())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn valid_token_without_database_is_unavailable() {
    let app = app_with(with_token(), RecordingNotifier::configured());

    let (status, body) = send(&app, authorized("GET", "/api/admin/leads?limit=10", TOKEN, Body::empty())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "ok": false, "error": "database_not_configured" }));

    let (status, body) = send(
        &app,
        authorized(
            "PATCH",
            "/api/admin/leads/6f1c2b0e-8a4d-4c41-9d7e-2b1f0c9a7e55/status",
            TOKEN,
            Body::from(json!({ "status": "done" }).to_string()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "database_not_configured");
}

#[tokio::test]
async fn health_without_database_is_ok() {
    let app = app(RecordingNotifier::configured());

    let (status, body) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "database": "not_configured" }));
}

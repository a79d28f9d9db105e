//! Session Lifecycle Tests
//!
//! Covers session start/end, bearer auth and the health probe.

mod common;

use axum::http::StatusCode;
use std::sync::Arc;

use billyatra::infra::store::MemoryStore;
use common::{app, test_config, TestApp, TEST_ADMIN_TOKEN};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn health_reports_ok_on_memory_store() {
    let app = app().await;
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
}

#[tokio::test]
async fn start_session_returns_token() {
    let app = app().await;
    let user_id = Uuid::new_v4();

    let resp = app
        .post_admin(
            "/v1/sessions",
            json!({ "user_id": user_id }),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["user_id"], user_id.to_string());
    assert!(Uuid::parse_str(body["token"].as_str().unwrap()).is_ok());
    assert!(body["started_at"].is_string());
}

#[tokio::test]
async fn start_session_requires_admin_token() {
    let app = app().await;
    let victim = app.start_session().await;

    let resp = app
        .post_json("/v1/sessions", json!({ "user_id": victim.user_id }), None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_admin(
            "/v1/sessions",
            json!({ "user_id": victim.user_id }),
            Some("guessed-token"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    // the victim's session is untouched
    let resp = app.get("/v1/notifications", Some(&victim.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(app.state.sessions.len().await, 1);
}

#[tokio::test]
async fn new_login_gets_a_new_token_and_retires_the_old_one() {
    let app = app().await;
    let user_id = Uuid::new_v4();

    let first = app.start_session_for(user_id).await;
    let second = app.start_session_for(user_id).await;
    assert_ne!(first.token, second.token);
    assert_eq!(app.state.sessions.len().await, 1);

    let resp = app.get("/v1/notifications", Some(&first.token)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    let resp = app.get("/v1/notifications", Some(&second.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn start_session_rejects_nil_user() {
    let app = app().await;
    let resp = app
        .post_admin(
            "/v1/sessions",
            json!({ "user_id": Uuid::nil() }),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_cap_answers_service_unavailable() {
    let mut config = test_config();
    config.max_live_sessions = 1;
    let app = TestApp::with_config(config, Arc::new(MemoryStore::new()));
    app.start_session().await;

    let resp = app
        .post_admin(
            "/v1/sessions",
            json!({ "user_id": Uuid::new_v4() }),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = app().await;

    let resp = app.get("/v1/notifications", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "missing Authorization header");

    let resp = app.get("/v1/notifications", Some("not-a-uuid")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let unknown = Uuid::new_v4().to_string();
    let resp = app.get("/v1/notifications", Some(&unknown)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid token");
}

#[tokio::test]
async fn ended_session_token_stops_working() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app.delete("/v1/sessions", Some(&session.token)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get("/v1/notifications", Some(&session.token)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.state.sessions.len().await, 0);
}

#[tokio::test]
async fn toasts_start_empty() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app.get("/v1/toasts", Some(&session.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 0);
}

//! Notification Queue Tests
//!
//! Covers listing, read state, removal, transaction events, toasts and
//! persistence across restarts.

mod common;

use axum::http::StatusCode;
use common::{app, TestApp};
use serde_json::json;

// ===========================================================================
// Posting
// ===========================================================================

#[tokio::test]
async fn new_notifications_are_listed_newest_first() {
    let app = app().await;
    let session = app.start_session().await;

    for title in ["first", "second"] {
        let resp = app
            .post_json(
                "/v1/notifications",
                json!({
                    "title": title,
                    "message": "hello",
                    "kind": "system",
                    "priority": "low"
                }),
                Some(&session.token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.json()["read"], false);
    }

    let resp = app.get("/v1/notifications", Some(&session.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "second");
    assert_eq!(items[1]["title"], "first");
    assert_ne!(items[0]["id"], items[1]["id"]);
    assert_eq!(body["unread_count"], 2);
}

#[tokio::test]
async fn promotional_kind_cannot_be_posted() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app
        .post_json(
            "/v1/notifications",
            json!({
                "title": "Free money",
                "message": "click",
                "kind": "promotional",
                "priority": "low"
            }),
            Some(&session.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app
        .post_json(
            "/v1/notifications",
            json!({
                "title": "  ",
                "message": "hello",
                "kind": "offer",
                "priority": "medium"
            }),
            Some(&session.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title is required");
}

// ===========================================================================
// Transactions and toasts
// ===========================================================================

#[tokio::test]
async fn successful_recharge_raises_high_priority_toast() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app
        .post_json(
            "/v1/notifications/transactions",
            json!({ "outcome": "success", "amount": 299, "destination": "9876543210" }),
            Some(&session.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let record = resp.json();
    assert_eq!(record["title"], "Recharge Successful");
    assert_eq!(record["kind"], "transaction");
    assert_eq!(record["priority"], "high");
    assert_eq!(record["action"]["url"], "/dashboard");
    assert!(record["message"].as_str().unwrap().contains("9876543210"));

    let resp = app.get("/v1/toasts", Some(&session.token)).await;
    let toasts = resp.json()["items"].as_array().unwrap().clone();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0]["title"], "Recharge Successful");
    assert_eq!(toasts[0]["duration_ms"], 5000);

    // Drained on read.
    let resp = app.get("/v1/toasts", Some(&session.token)).await;
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn pending_recharge_does_not_toast() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app
        .post_json(
            "/v1/notifications/transactions",
            json!({ "outcome": "pending", "amount": 149, "destination": "DTH 1234" }),
            Some(&session.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["priority"], "medium");
    assert_eq!(resp.json()["title"], "Recharge Processing");

    let resp = app.get("/v1/toasts", Some(&session.token)).await;
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_outcome_is_rejected() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app
        .post_json(
            "/v1/notifications/transactions",
            json!({ "outcome": "refunded", "amount": 10, "destination": "x" }),
            Some(&session.token),
        )
        .await;
    assert!(resp.status.is_client_error());
}

// ===========================================================================
// Read state and removal
// ===========================================================================

async fn seed(app: &TestApp, token: &str, count: usize) -> Vec<String> {
    let mut ids = Vec::new();
    for i in 0..count {
        let resp = app
            .post_json(
                "/v1/notifications",
                json!({
                    "title": format!("n{}", i),
                    "message": "m",
                    "kind": "offer",
                    "priority": "low"
                }),
                Some(token),
            )
            .await;
        ids.push(resp.json()["id"].as_str().unwrap().to_string());
    }
    ids
}

#[tokio::test]
async fn mark_read_updates_unread_count() {
    let app = app().await;
    let session = app.start_session().await;
    let ids = seed(&app, &session.token, 3).await;

    let resp = app
        .post_json(
            &format!("/v1/notifications/{}/read", ids[1]),
            json!({}),
            Some(&session.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let body = app.get("/v1/notifications", Some(&session.token)).await.json();
    assert_eq!(body["unread_count"], 2);

    // Marking an already-read notification is a no-op, not a miss.
    let resp = app
        .post_json(
            &format!("/v1/notifications/{}/read", ids[1]),
            json!({}),
            Some(&session.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    let body = app.get("/v1/notifications", Some(&session.token)).await.json();
    assert_eq!(body["unread_count"], 2);
}

#[tokio::test]
async fn mark_read_unknown_id_is_not_found() {
    let app = app().await;
    let session = app.start_session().await;

    let resp = app
        .post_json(
            "/v1/notifications/does-not-exist/read",
            json!({}),
            Some(&session.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_all_clears_unread_count() {
    let app = app().await;
    let session = app.start_session().await;
    seed(&app, &session.token, 3).await;

    let resp = app
        .post_json("/v1/notifications/read-all", json!({}), Some(&session.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["updated"], 3);

    let body = app.get("/v1/notifications", Some(&session.token)).await.json();
    assert_eq!(body["unread_count"], 0);
    assert!(body["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|item| item["read"] == true));
}

#[tokio::test]
async fn remove_and_clear() {
    let app = app().await;
    let session = app.start_session().await;
    let ids = seed(&app, &session.token, 3).await;

    let resp = app
        .delete(&format!("/v1/notifications/{}", ids[0]), Some(&session.token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .delete(&format!("/v1/notifications/{}", ids[0]), Some(&session.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let body = app.get("/v1/notifications", Some(&session.token)).await.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let resp = app.delete("/v1/notifications", Some(&session.token)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let body = app.get("/v1/notifications", Some(&session.token)).await.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["unread_count"], 0);
}

// ===========================================================================
// Persistence
// ===========================================================================

#[tokio::test]
async fn notifications_survive_a_restart() {
    let app = app().await;
    let session = app.start_session().await;
    let ids = seed(&app, &session.token, 2).await;
    app.post_json(
        &format!("/v1/notifications/{}/read", ids[0]),
        json!({}),
        Some(&session.token),
    )
    .await;

    let restarted = TestApp::with_store(app.store.clone());
    let again = restarted.start_session_for(session.user_id).await;

    let body = restarted
        .get("/v1/notifications", Some(&again.token))
        .await
        .json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], ids[1]);
    assert_eq!(body["unread_count"], 1);
}

#[tokio::test]
async fn users_do_not_see_each_others_notifications() {
    let app = app().await;
    let alice = app.start_session().await;
    let bob = app.start_session().await;
    seed(&app, &alice.token, 2).await;

    let body = app.get("/v1/notifications", Some(&bob.token)).await.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

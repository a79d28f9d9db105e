#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use billyatra::config::{AppConfig, StoreBackend};
use billyatra::infra::store::MemoryStore;
use billyatra::AppState;

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestSession {
    pub user_id: Uuid,
    pub token: String,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        http_addr: "127.0.0.1:0".to_string(),
        store_backend: StoreBackend::Memory,
        redis_url: String::new(),
        admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
        promo_interval_seconds: 300,
        promo_cooldown_seconds: 1800,
        toast_duration_ms: 5000,
        referral_reward_amount: 50,
        session_idle_timeout_seconds: 1800,
        session_sweep_interval_seconds: 60,
        max_live_sessions: 100,
    }
}

/// A fresh app on its own in-memory store.
pub async fn app() -> TestApp {
    TestApp::with_store(Arc::new(MemoryStore::new()))
}

impl TestApp {
    /// Builds an app over an existing store, as a restarted server would.
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::with_config(test_config(), store)
    }

    pub fn with_config(config: AppConfig, store: Arc<MemoryStore>) -> Self {
        let state = AppState::new(&config, store.clone());
        let router = billyatra::http::router(state.clone());
        TestApp {
            router,
            state,
            store,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::DELETE, path, None, &headers).await
    }

    /// POST with an admin token in the x-admin-token header.
    pub async fn post_admin(
        &self,
        path: &str,
        body: Value,
        admin_token: Option<&str>,
    ) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    /// Starts a session for `user_id` the way the auth backend does.
    pub async fn start_session_for(&self, user_id: Uuid) -> TestSession {
        let resp = self
            .post_admin(
                "/v1/sessions",
                json!({ "user_id": user_id }),
                Some(TEST_ADMIN_TOKEN),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "start session failed");
        let token = resp.json()["token"]
            .as_str()
            .expect("session token missing")
            .to_string();
        TestSession { user_id, token }
    }

    pub async fn start_session(&self) -> TestSession {
        self.start_session_for(Uuid::new_v4()).await
    }
}

use axum::{routing::delete, routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn sessions() -> Router<AppState> {
    Router::new()
        .route("/v1/sessions", post(handlers::start_session))
        .route("/v1/sessions", delete(handlers::end_session))
        .route("/v1/toasts", get(handlers::take_toasts))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(handlers::list_notifications))
        .route("/v1/notifications", post(handlers::create_notification))
        .route("/v1/notifications", delete(handlers::clear_notifications))
        .route("/v1/notifications/read-all", post(handlers::mark_all_read))
        .route(
            "/v1/notifications/transactions",
            post(handlers::notify_transaction),
        )
        .route("/v1/notifications/:id", delete(handlers::remove_notification))
        .route("/v1/notifications/:id/read", post(handlers::mark_read))
}

pub fn scratch_cards() -> Router<AppState> {
    Router::new()
        .route("/v1/scratch-cards", post(handlers::issue_scratch_card))
        .route("/v1/scratch-cards/:id", get(handlers::get_scratch_card))
        .route(
            "/v1/scratch-cards/:id/strokes",
            post(handlers::scratch_stroke),
        )
        .route(
            "/v1/scratch-cards/:id/dismiss",
            post(handlers::dismiss_scratch_card),
        )
}

pub fn referrals() -> Router<AppState> {
    Router::new()
        .route("/v1/referrals", get(handlers::list_referrals))
        .route("/v1/referrals", post(handlers::send_referral))
        .route("/v1/referrals/stats", get(handlers::referral_stats))
        .route("/v1/referrals/rewards", post(handlers::process_referral_reward))
}

use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminToken, SessionUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::sessions())
        .merge(routes::notifications())
        .merge(routes::scratch_cards())
        .merge(routes::referrals())
        .with_state(state)
}

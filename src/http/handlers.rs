use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::referrals::{Referral, ReferralStats, SendReferralError};
use crate::app::scratch_cards::{DismissOutcome, ScratchCardView, Stroke};
use crate::app::toasts::Toast;
use crate::domain::notification::{
    NotificationDraft, NotificationKind, NotificationRecord, Priority, TransactionOutcome,
};
use crate::domain::random::ThreadRandom;
use crate::domain::scratch::Prize;
use crate::http::{AdminToken, AppError, SessionUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

/// Called by the auth backend once it has verified the user.
pub async fn start_session(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(payload): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    if payload.user_id.is_nil() {
        return Err(AppError::bad_request("user_id is required"));
    }

    let session = state
        .sessions
        .start(payload.user_id)
        .await
        .map_err(|_| AppError::service_unavailable("too many live sessions"))?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token: session.token,
            user_id: session.user_id,
            started_at: session.started_at,
        }),
    ))
}

pub async fn end_session(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<StatusCode, AppError> {
    if !state.sessions.end(session.token).await {
        return Err(AppError::not_found("session not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn take_toasts(SessionUser(session): SessionUser) -> Json<ListResponse<Toast>> {
    let items = session.toasts.take_active(OffsetDateTime::now_utc());
    Json(ListResponse { items })
}

#[derive(Serialize)]
pub struct NotificationListResponse {
    pub items: Vec<NotificationRecord>,
    pub unread_count: usize,
}

pub async fn list_notifications(
    SessionUser(session): SessionUser,
) -> Json<NotificationListResponse> {
    let queue = session.queue.lock().await;
    Json(NotificationListResponse {
        items: queue.notifications().to_vec(),
        unread_count: queue.unread_count(),
    })
}

pub async fn create_notification(
    SessionUser(session): SessionUser,
    Json(draft): Json<NotificationDraft>,
) -> Result<(StatusCode, Json<NotificationRecord>), AppError> {
    if draft.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if draft.message.trim().is_empty() {
        return Err(AppError::bad_request("message is required"));
    }
    if draft.kind == NotificationKind::Promotional {
        return Err(AppError::bad_request(
            "promotional notifications are generated by the server",
        ));
    }

    let record = session.queue.lock().await.add_notification(draft).await;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Deserialize)]
pub struct TransactionRequest {
    pub outcome: TransactionOutcome,
    pub amount: u64,
    pub destination: String,
}

pub async fn notify_transaction(
    SessionUser(session): SessionUser,
    Json(payload): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<NotificationRecord>), AppError> {
    let destination = payload.destination.trim();
    if destination.is_empty() {
        return Err(AppError::bad_request("destination is required"));
    }

    let record = session
        .queue
        .lock()
        .await
        .notify_transaction(payload.outcome, payload.amount, destination)
        .await;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn mark_read(
    SessionUser(session): SessionUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut queue = session.queue.lock().await;
    if !queue.contains(&id) {
        return Err(AppError::not_found("notification not found"));
    }
    queue.mark_as_read(&id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

pub async fn mark_all_read(SessionUser(session): SessionUser) -> Json<MarkAllReadResponse> {
    let updated = session.queue.lock().await.mark_all_as_read().await;
    Json(MarkAllReadResponse { updated })
}

pub async fn remove_notification(
    SessionUser(session): SessionUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !session.queue.lock().await.remove_notification(&id).await {
        return Err(AppError::not_found("notification not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_notifications(SessionUser(session): SessionUser) -> StatusCode {
    session.queue.lock().await.clear_all().await;
    StatusCode::NO_CONTENT
}

#[derive(Deserialize, Default)]
pub struct IssueCardRequest {
    #[serde(default)]
    pub amount: Option<u32>,
}

pub async fn issue_scratch_card(
    SessionUser(session): SessionUser,
    Json(payload): Json<IssueCardRequest>,
) -> Result<(StatusCode, Json<ScratchCardView>), AppError> {
    let view = session
        .scratch_cards
        .lock()
        .await
        .issue(payload.amount, &mut ThreadRandom)
        .map_err(|_| AppError::rate_limited("too many open scratch cards"))?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_scratch_card(
    SessionUser(session): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScratchCardView>, AppError> {
    session
        .scratch_cards
        .lock()
        .await
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("scratch card not found"))
}

pub async fn scratch_stroke(
    SessionUser(session): SessionUser,
    Path(id): Path<Uuid>,
    Json(stroke): Json<Stroke>,
) -> Result<Json<ScratchCardView>, AppError> {
    let invalid_size = [stroke.display_width, stroke.display_height]
        .into_iter()
        .flatten()
        .any(|size| !size.is_finite() || size <= 0.0);
    if invalid_size {
        return Err(AppError::bad_request("display size must be positive"));
    }

    session
        .scratch_cards
        .lock()
        .await
        .stroke(id, stroke)
        .map(Json)
        .ok_or_else(|| AppError::not_found("scratch card not found"))
}

#[derive(Serialize)]
pub struct DismissResponse {
    pub prize: Prize,
}

pub async fn dismiss_scratch_card(
    SessionUser(session): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DismissResponse>, AppError> {
    let outcome = session.scratch_cards.lock().await.dismiss(id);
    match outcome {
        DismissOutcome::Completed(prize) => Ok(Json(DismissResponse { prize })),
        DismissOutcome::NotRevealed => Err(AppError::conflict("scratch card not revealed yet")),
        DismissOutcome::NotFound => Err(AppError::not_found("scratch card not found")),
    }
}

pub async fn list_referrals(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<Json<ListResponse<Referral>>, AppError> {
    let items = state.referrals.list(session.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %session.user_id, "failed to list referrals");
        AppError::internal("failed to list referrals")
    })?;
    Ok(Json(ListResponse { items }))
}

pub async fn referral_stats(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<Json<ReferralStats>, AppError> {
    let stats = state.referrals.stats(session.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %session.user_id, "failed to load referral stats");
        AppError::internal("failed to load referral stats")
    })?;
    Ok(Json(stats))
}

#[derive(Deserialize)]
pub struct SendReferralRequest {
    pub email: String,
}

pub async fn send_referral(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Json(payload): Json<SendReferralRequest>,
) -> Result<(StatusCode, Json<Referral>), AppError> {
    match state
        .referrals
        .send_referral(session.user_id, &payload.email)
        .await
    {
        Ok(referral) => Ok((StatusCode::CREATED, Json(referral))),
        Err(err @ SendReferralError::InvalidEmail) => Err(AppError::bad_request(err.to_string())),
        Err(err @ SendReferralError::AlreadyPending) => Err(AppError::conflict(err.to_string())),
        Err(err @ SendReferralError::Store(_)) => {
            tracing::error!(error = %err, user_id = %session.user_id, "failed to send referral");
            Err(AppError::internal("failed to send referral"))
        }
    }
}

#[derive(Deserialize)]
pub struct RewardRequest {
    pub referred_email: String,
}

pub async fn process_referral_reward(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(payload): Json<RewardRequest>,
) -> Result<Json<Referral>, AppError> {
    let completed = state
        .referrals
        .process_reward(&payload.referred_email)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to process referral reward");
            AppError::internal("failed to process referral reward")
        })?
        .ok_or_else(|| AppError::not_found("no pending referral for this email"))?;

    if let Some(referrer) = state.sessions.find_by_user(completed.referrer_id).await {
        let message = format!(
            "Your friend {} completed their first recharge. ₹{} has been added to your rewards.",
            completed.referred_email, completed.reward_amount
        );
        referrer
            .queue
            .lock()
            .await
            .notify_system("Referral Reward Earned", &message, Priority::Medium)
            .await;
    }

    Ok(Json(completed))
}

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use bebaby_types::api::{NotifyTripRequest, NotifyTripResponse};
use bebaby_types::models::TripNotice;

use crate::error::ApiError;
use crate::extract::{ActiveUser, ApiJson, AuthUser};
use crate::state::{AppState, run_db};
use crate::validate;

const INBOX_LIMIT: u32 = 100;

/// POST /notify-trip. Announces the caller's own trip to everyone in the
/// target state. Re-sending the same trip creates nothing new.
pub async fn notify_trip(
    State(state): State<AppState>,
    user: ActiveUser,
    ApiJson(req): ApiJson<NotifyTripRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender = validate::required("userId", &req.user_id)?;
    if sender != user.id().to_string() {
        return Err(ApiError::Forbidden("Cannot announce a trip for another user"));
    }
    validate::required("username", &req.username)?;

    let trip = TripNotice {
        sender_id: user.id(),
        // The token's name is authoritative; the body's is only checked for
        // presence.
        sender_username: user.username().to_string(),
        state: validate::max_len("state", &req.state, 64)?.to_string(),
        city: validate::max_len("city", &req.city, 128)?.to_string(),
        start: validate::max_len("start", &req.start, 32)?.to_string(),
        end: validate::max_len("end", &req.end, 32)?.to_string(),
    };

    let (recipients, created) = run_db(&state, move |db| db.fan_out_trip(&trip)).await?;
    Ok(Json(NotifyTripResponse {
        recipients,
        created,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let id = user.id();
    let items = run_db(&state, move |db| db.list_notifications(id, INBOX_LIMIT)).await?;
    Ok(Json(items))
}

/// PUT /notifications/{id}/read. Only the owner may mark a notification.
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = user.id();
    run_db(&state, move |db| db.mark_notification_read(&id, owner)).await?;
    Ok(Json(json!({ "success": true })))
}

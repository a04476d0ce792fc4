use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use bebaby_types::api::{
    ConversationResponse, CreateConversationRequest, MessagePage, SendMessageRequest,
};

use crate::error::ApiError;
use crate::extract::{ActiveUser, ApiJson, AuthUser};
use crate::state::{AppState, run_db};
use crate::validate;

const MAX_MESSAGE_LEN: usize = 2000;
pub const MESSAGE_PAGE: u32 = 200;

/// POST /conversations. Idempotent per pair: 201 on first call, 200 after.
pub async fn create(
    State(state): State<AppState>,
    user: ActiveUser,
    ApiJson(req): ApiJson<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let participant: Uuid = validate::required("participantId", &req.participant_id)?
        .parse()
        .map_err(|_| ApiError::NotFound("user"))?;
    if participant == user.id() {
        return Err(ApiError::validation("Cannot start a conversation with yourself"));
    }

    let me = user.id();
    let (conversation, created) =
        run_db(&state, move |db| db.get_or_create_conversation(me, participant)).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ConversationResponse {
            conversation,
            created,
        }),
    ))
}

/// GET /conversations/{id}/messages[?before=<message id>]. Returns the
/// newest page, or the page older than `before`, and marks the caller's
/// incoming messages on that page read. Non-participants get 404.
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(page): Query<MessagePage>,
) -> Result<impl IntoResponse, ApiError> {
    let me = user.id();
    let messages = run_db(&state, move |db| {
        let conversation = db
            .get_conversation(&id)?
            .filter(|c| c.participants.contains(&me))
            .ok_or(bebaby_db::DbError::NotFound("conversation"))?;
        let messages =
            db.list_messages(&conversation.id, page.before.as_deref(), MESSAGE_PAGE)?;
        let shown: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        db.mark_messages_read(&conversation.id, me, &shown)?;
        Ok(messages)
    })
    .await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: ActiveUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validate::max_len("content", &req.content, MAX_MESSAGE_LEN)?.to_string();
    let me = user.id();
    let message = run_db(&state, move |db| db.insert_message(&id, me, &content)).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

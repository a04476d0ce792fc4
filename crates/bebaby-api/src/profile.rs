//! Profile submissions that wait for moderation: `about` text edits and
//! photo uploads. Neither reaches the public profile until an admin approves
//! it.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use uuid::Uuid;

use bebaby_types::api::{SubmissionResponse, UpdateAboutRequest};

use crate::error::ApiError;
use crate::extract::{ActiveUser, ApiJson};
use crate::state::{AppState, run_db};
use crate::validate;

/// 5 MB upload limit for photos.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

const MAX_ABOUT_LEN: usize = 1000;

/// PUT /me/about
pub async fn update_about(
    State(state): State<AppState>,
    user: ActiveUser,
    ApiJson(req): ApiJson<UpdateAboutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let about = validate::max_len("about", &req.about, MAX_ABOUT_LEN)?.to_string();
    let me = user.id();
    let text = run_db(&state, move |db| db.create_pending_text(me, "about", &about)).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            id: text.id,
            status: text.status,
            url: None,
        }),
    ))
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// POST /photos with raw image bytes as the body. The file name is a fresh
/// UUID, never anything the client sent.
pub async fn upload_photo(
    State(state): State<AppState>,
    user: ActiveUser,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let ext = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| extension_for(ct.split(';').next().unwrap_or_default().trim()))
        .ok_or_else(|| ApiError::validation("Unsupported image type"))?;

    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!("Photo exceeds {MAX_PHOTO_BYTES} bytes"))
        } else {
            ApiError::Validation(rejection.body_text())
        }
    })?;
    if bytes.is_empty() {
        return Err(ApiError::validation("Photo is empty"));
    }
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(ApiError::PayloadTooLarge(format!(
            "Photo exceeds {MAX_PHOTO_BYTES} bytes"
        )));
    }

    let file_name = format!("{}.{ext}", Uuid::new_v4());
    let dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", dir.display(), e);
        ApiError::Internal(e.into())
    })?;

    let path = dir.join(&file_name);
    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        error!("Failed to create file {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;

    let url = format!("/uploads/{file_name}");
    let me = user.id();
    let stored_url = url.clone();
    let photo = match run_db(&state, move |db| db.create_photo(me, &stored_url)).await {
        Ok(photo) => photo,
        Err(e) => {
            // Nothing references the file, and /uploads would serve it.
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                error!("Failed to remove orphaned upload {}: {}", path.display(), rm);
            }
            return Err(e);
        }
    };

    info!(user_id = %me, photo_id = %photo.id, size = bytes.len(), "photo uploaded");
    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            id: photo.id,
            status: photo.status,
            url: Some(url),
        }),
    ))
}

//! Admin user lifecycle: listing, privileged creation, premium toggling and
//! soft deactivation. Accounts are never physically deleted.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use bebaby_db::NewUser;
use bebaby_types::api::{
    CreateUserRequest, DeactivateUserRequest, StatusFilter, TogglePremiumRequest, UserResponse,
};
use bebaby_types::models::UserStatus;

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::extract::{AdminGuard, ApiJson};
use crate::state::{AppState, run_db};
use crate::validate;

const USER_PAGE: u32 = 200;

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminGuard,
    Query(filter): Query<StatusFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<UserStatus>)
        .transpose()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let users = run_db(&state, move |db| db.list_users(status, USER_PAGE, 0)).await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    admin: AdminGuard,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validate::email(&req.email)?;
    let username = validate::username(&req.username)?.to_string();
    let password = validate::password(&req.password)?;

    let mut new = NewUser::new(&email, &username, &hash_password(password)?, req.user_type);
    new.is_admin = req.is_admin;
    new.birthdate = req.birthdate;
    new.gender = req.gender;
    new.state = req.state;
    new.city = req.city;
    // Accounts an admin creates are vouched for.
    new.verified = true;

    let user = run_db(&state, move |db| db.create_user(&new)).await?;

    info!(admin_id = %admin.admin_id(), user_id = %user.id, is_admin = user.is_admin, "user created by admin");
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Overwrites `premium` unconditionally. No payment record is consulted.
pub async fn toggle_premium(
    State(state): State<AppState>,
    admin: AdminGuard,
    ApiJson(req): ApiJson<TogglePremiumRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = validate::required("userId", &req.user_id)?.to_string();
    let premium = req.premium;

    let user = run_db(&state, move |db| db.set_premium(&user_id, premium)).await?;

    info!(admin_id = %admin.admin_id(), user_id = %user.id, premium, "premium toggled");
    Ok(Json(UserResponse { user }))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    admin: AdminGuard,
    ApiJson(req): ApiJson<DeactivateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = validate::required("userId", &req.user_id)?.to_string();

    let user = run_db(&state, move |db| db.set_user_status(&user_id, UserStatus::Inactive)).await?;
    if user.is_admin {
        state.sessions.revoke_admin(user.id);
    }

    info!(admin_id = %admin.admin_id(), user_id = %user.id, "user deactivated");
    Ok(Json(UserResponse { user }))
}

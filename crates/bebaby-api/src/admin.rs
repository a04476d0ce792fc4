use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use tracing::{info, warn};

use bebaby_security::sessions::SESSION_TTL_SECS;
use bebaby_security::token::generate_token;
use bebaby_types::api::{AdminLoginRequest, AdminLoginResponse, CsrfResponse};
use bebaby_types::models::UserStatus;

use crate::auth::verify_password;
use crate::error::ApiError;
use crate::extract::{ADMIN_COOKIE, AdminGuard, ApiJson, CSRF_COOKIE};
use crate::state::{AppState, run_db};

/// POST /admin/login. Starts a per-admin session and sets `admin_session`.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<AdminLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let lookup = username.clone();
    let (admin, hash) = run_db(&state, move |db| db.get_admin_credentials(&lookup))
        .await?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    if !verify_password(&req.password, &hash)? || admin.status != UserStatus::Active {
        warn!(username = %username, "failed admin login");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    // A re-login from the same browser replaces, not stacks, the session.
    if let Some(previous) = jar.get(ADMIN_COOKIE) {
        state.sessions.revoke(previous.value());
        state.csrf.revoke(previous.value());
    }

    let session = state.sessions.create(admin.id, &admin.username);
    let cookie = Cookie::build((ADMIN_COOKIE, session.token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(state.config.secure_cookies)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build();

    info!(admin_id = %admin.id, "admin logged in");
    Ok((
        jar.add(cookie),
        Json(AdminLoginResponse {
            admin_id: admin.id,
            username: admin.username,
        }),
    ))
}

/// POST /admin/logout. Drops the session and any CSRF token issued to it.
pub async fn logout(
    State(state): State<AppState>,
    admin: AdminGuard,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.revoke(&admin.session.token);
    state.csrf.revoke(&admin.session.token);
    info!(admin_id = %admin.admin_id(), "admin logged out");
    Ok((
        jar.remove(Cookie::build(ADMIN_COOKIE).path("/")),
        Json(json!({ "success": true })),
    ))
}

/// GET /admin/csrf. Keys the token on the admin session when there is one,
/// otherwise on an anonymous `csrf_sid` cookie created on demand. Issuing
/// supersedes the previous token for that key.
pub async fn csrf(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let admin_session = jar
        .get(ADMIN_COOKIE)
        .and_then(|c| state.sessions.get(c.value()));

    let (jar, key) = match admin_session {
        Some(session) => (jar, session.token),
        None => match jar.get(CSRF_COOKIE).map(|c| c.value().to_string()) {
            Some(sid) => (jar, anonymous_key(&sid)),
            None => {
                let sid = generate_token();
                let cookie = Cookie::build((CSRF_COOKIE, sid.clone()))
                    .http_only(true)
                    .same_site(SameSite::Strict)
                    .path("/")
                    .secure(state.config.secure_cookies)
                    .build();
                (jar.add(cookie), anonymous_key(&sid))
            }
        },
    };

    let csrf_token = state.csrf.issue(&key);
    Ok((jar, Json(CsrfResponse { csrf_token })))
}

/// Anonymous ids live in their own namespace so they can never address an
/// admin session's token.
fn anonymous_key(sid: &str) -> String {
    format!("anon:{sid}")
}

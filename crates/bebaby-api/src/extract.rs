//! Request guards and the JSON body extractor.
//!
//! Privileged handlers take [`AdminGuard`] as their first extractor, so the
//! session and CSRF checks run before the body is even read. User handlers
//! take [`AuthUser`] (valid bearer token) or [`ActiveUser`] (valid token and
//! an account that may still act).

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::{Method, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;
use uuid::Uuid;

use bebaby_security::sessions::AdminSession;
use bebaby_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

pub const ADMIN_COOKIE: &str = "admin_session";
pub const CSRF_COOKIE: &str = "csrf_sid";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// `Json<T>` whose rejection is a 400 with serde's message in our error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

/// An authenticated admin. Mutating methods must also carry a CSRF token
/// for this session, which is consumed on success.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    pub session: AdminSession,
}

impl AdminGuard {
    pub fn admin_id(&self) -> Uuid {
        self.session.admin_id
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session = jar
            .get(ADMIN_COOKIE)
            .and_then(|cookie| state.sessions.get(cookie.value()))
            .ok_or(ApiError::Unauthorized("Unauthorized"))?;

        if is_mutating(&parts.method) {
            let candidate = parts
                .headers
                .get(CSRF_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Forbidden("CSRF token missing"))?;

            if !state.csrf.consume(&session.token, candidate) {
                warn!(admin_id = %session.admin_id, path = %parts.uri.path(), "rejected CSRF token");
                return Err(ApiError::Forbidden("CSRF token invalid"));
            }
        }

        Ok(Self { session })
    }
}

/// Caller identified by a valid `Authorization: Bearer` JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.claims.sub
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized("Unauthorized"))?;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthorized("Unauthorized"))?;

        Ok(Self {
            claims: data.claims,
        })
    }
}

/// An authenticated user whose account is neither banned nor deactivated.
/// Status is read fresh on every request, so a ban takes effect at once.
#[derive(Debug, Clone)]
pub struct ActiveUser(pub AuthUser);

impl ActiveUser {
    pub fn id(&self) -> Uuid {
        self.0.id()
    }

    pub fn username(&self) -> &str {
        &self.0.claims.username
    }
}

impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let id = user.id().to_string();
        let status = run_db(state, move |db| db.get_user_status(&id))
            .await?
            .ok_or(ApiError::Unauthorized("Unauthorized"))?;

        if !status.can_interact() {
            warn!(user_id = %user.id(), %status, "inactive account blocked");
            return Err(ApiError::Forbidden("Account is not active"));
        }
        Ok(Self(user))
    }
}

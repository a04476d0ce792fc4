// `OsRng` needs the `getrandom` feature, which the direct `rand_core`
// dependency turns on.
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use bebaby_db::NewUser;
use bebaby_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, run_db};
use crate::validate;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validate::email(&req.email)?;
    let username = validate::username(&req.username)?.to_string();
    let password = validate::password(&req.password)?;

    let mut new = NewUser::new(&email, &username, &hash_password(password)?, req.user_type);
    new.birthdate = req.birthdate;
    new.gender = req.gender;
    new.looking_for = req.looking_for;
    new.state = req.state;
    new.city = req.city;
    new.education = req.education;
    new.profession = req.profession;

    // Uniqueness is left to the UNIQUE constraints; a duplicate comes back
    // as a 409 naming the column.
    let user = run_db(&state, move |db| db.create_user(&new)).await?;
    let token = create_token(&state.config.jwt_secret, user.id, &user.username)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            username: user.username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let (user, hash) = run_db(&state, move |db| db.get_credentials_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    if !verify_password(&req.password, &hash)? {
        warn!(user_id = %user.id, "failed login");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }
    if !user.status.can_log_in() {
        return Err(ApiError::Forbidden("Account is deactivated"));
    }

    let token = create_token(&state.config.jwt_secret, user.id, &user.username)?;
    Ok(Json(AuthResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

/// Argon2id with a fresh random salt, PHC string format.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// False on mismatch; an unparseable stored hash is an internal error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

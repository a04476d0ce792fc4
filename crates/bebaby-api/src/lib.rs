pub mod admin;
pub mod auth;
pub mod conversations;
pub mod error;
pub mod extract;
pub mod moderation;
pub mod notifications;
pub mod profile;
pub mod rate_limit;
pub mod reports;
pub mod state;
pub mod users;
pub mod validate;

pub use error::ApiError;
pub use state::{ApiConfig, AppState, AppStateInner};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::rate_limit::ClientLimit;

/// The full HTTP surface.
///
/// Each route group sits behind exactly one rate limiter: the auth limiter
/// for credential endpoints, the upload limiter for photo uploads, and the
/// general limiter for everything else.
pub fn router(state: AppState) -> Router {
    let trust_proxy = state.config.trust_proxy;

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/admin/login", post(admin::login))
        .layer(middleware::from_fn_with_state(
            ClientLimit::new(state.limiters.auth.clone(), trust_proxy),
            rate_limit::enforce,
        ));

    let upload_routes = Router::new()
        .route("/photos", post(profile::upload_photo))
        .layer(DefaultBodyLimit::max(profile::MAX_PHOTO_BYTES))
        .layer(middleware::from_fn_with_state(
            ClientLimit::new(state.limiters.upload.clone(), trust_proxy),
            rate_limit::enforce,
        ));

    let admin_routes = Router::new()
        .route("/admin/logout", post(admin::logout))
        .route("/admin/csrf", get(admin::csrf))
        .route(
            "/admin/manage-report",
            put(moderation::manage_report).delete(moderation::delete_report),
        )
        .route("/admin/moderate-content", put(moderation::moderate_content))
        .route("/admin/reports", get(moderation::list_reports))
        .route("/admin/pending-content", get(moderation::pending_content))
        .route("/admin/users", get(users::list_users).post(users::create_user))
        .route("/admin/toggle-premium", post(users::toggle_premium))
        .route("/admin/deactivate-user", post(users::deactivate_user));

    let user_routes = Router::new()
        .route("/notify-trip", post(notifications::notify_trip))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        .route("/reports", post(reports::create_report))
        .route("/conversations", post(conversations::create))
        .route(
            "/conversations/{id}/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route("/me/about", put(profile::update_about))
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir));

    let api_routes = admin_routes.merge(user_routes).layer(
        middleware::from_fn_with_state(
            ClientLimit::new(state.limiters.api.clone(), trust_proxy),
            rate_limit::enforce,
        ),
    );

    Router::new()
        .merge(auth_routes)
        .merge(upload_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

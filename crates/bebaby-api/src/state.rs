use std::path::PathBuf;
use std::sync::Arc;

use bebaby_db::Database;
use bebaby_security::csrf::CsrfStore;
use bebaby_security::rate_limit::RateLimiters;
use bebaby_security::sessions::SessionStore;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

/// Settings the handlers read at request time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    /// Adds `Secure` to the cookies we set. Off only for plain-HTTP local runs.
    pub secure_cookies: bool,
    /// Take the client address from `x-forwarded-for` / `x-real-ip`. Only
    /// safe when a proxy in front of us overwrites those headers.
    pub trust_proxy: bool,
}

/// Process-wide state, built once at startup and shared by every handler.
/// The in-memory stores sit behind `Arc` so their sweep tasks can hold them
/// independently of the router.
pub struct AppStateInner {
    pub db: Database,
    pub csrf: Arc<CsrfStore>,
    pub sessions: Arc<SessionStore>,
    pub limiters: RateLimiters,
    pub config: ApiConfig,
}

impl AppStateInner {
    pub fn new(db: Database, limiters: RateLimiters, config: ApiConfig) -> AppState {
        Arc::new(Self {
            db,
            csrf: Arc::new(CsrfStore::new()),
            sessions: Arc::new(SessionStore::new()),
            limiters,
            config,
        })
    }
}

/// Run a database call on the blocking pool.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> bebaby_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db)).await?;
    Ok(result?)
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use bebaby_security::rate_limit::{RateLimitConfig, RateLimiters};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Credentials for the admin account created at startup if missing.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub secure_cookies: bool,
    pub trust_proxy: bool,
    pub admin: Option<AdminBootstrap>,
    pub rate_api: RateLimitConfig,
    pub rate_auth: RateLimitConfig,
    pub rate_upload: RateLimitConfig,
    pub sweep_every: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("BEBABY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("BEBABY_JWT_SECRET is unset or still a placeholder");
        }

        let admin = match (
            get("BEBABY_ADMIN_USERNAME"),
            get("BEBABY_ADMIN_EMAIL"),
            get("BEBABY_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminBootstrap {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => bail!(
                "BEBABY_ADMIN_USERNAME, BEBABY_ADMIN_EMAIL and BEBABY_ADMIN_PASSWORD must be set together"
            ),
        };

        Ok(Self {
            host: or("BEBABY_HOST", "0.0.0.0"),
            port: parse(&get, "BEBABY_PORT", 3000)?,
            db_path: or("BEBABY_DB_PATH", "bebaby.db").into(),
            jwt_secret,
            upload_dir: or("BEBABY_UPLOAD_DIR", "./uploads").into(),
            secure_cookies: parse(&get, "BEBABY_SECURE_COOKIES", true)?,
            trust_proxy: parse(&get, "BEBABY_TRUST_PROXY", false)?,
            admin,
            rate_api: parse(&get, "BEBABY_RATE_API", RateLimiters::DEFAULT_API)?,
            rate_auth: parse(&get, "BEBABY_RATE_AUTH", RateLimiters::DEFAULT_AUTH)?,
            rate_upload: parse(&get, "BEBABY_RATE_UPLOAD", RateLimiters::DEFAULT_UPLOAD)?,
            sweep_every: Duration::from_secs(parse(&get, "BEBABY_SWEEP_SECS", 300u64)?.max(1)),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        None => Ok(default),
    }
}

mod bootstrap;
mod config;

use std::net::SocketAddr;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bebaby_api::{ApiConfig, AppStateInner};
use bebaby_db::Database;
use bebaby_security::rate_limit::RateLimiters;
use bebaby_security::sweeper::Sweeper;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e:#}");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database
    let db = Database::open(&config.db_path)?;
    if let Some(admin) = &config.admin {
        bootstrap::ensure_admin(&db, admin)?;
    }

    // Shared state
    let limiters = RateLimiters::new(config.rate_api, config.rate_auth, config.rate_upload);
    let state = AppStateInner::new(
        db,
        limiters.clone(),
        ApiConfig {
            jwt_secret: config.jwt_secret.clone(),
            upload_dir: config.upload_dir.clone(),
            secure_cookies: config.secure_cookies,
            trust_proxy: config.trust_proxy,
        },
    );
    if !config.secure_cookies {
        info!("Secure cookie flag disabled; use only behind plain-HTTP local setups");
    }
    if config.trust_proxy {
        info!("Rate limits keyed on x-forwarded-for / x-real-ip");
    }

    // Background sweeps of the in-memory stores
    let sweeper = Sweeper::new();
    sweeper.spawn(limiters.api.clone(), config.sweep_every);
    sweeper.spawn(limiters.auth.clone(), config.sweep_every);
    sweeper.spawn(limiters.upload.clone(), config.sweep_every);
    sweeper.spawn(state.csrf.clone(), config.sweep_every);
    sweeper.spawn(state.sessions.clone(), config.sweep_every);

    let app = bebaby_api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Bebaby server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.shutdown();
    if let Err(e) = &served {
        error!("server error: {}", e);
    }
    served?;

    info!("Server stopped");
    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bebaby=debug,tower_http=debug".into());

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use bebaby_security::rate_limit::RateLimiter;

use crate::error::ApiError;

const MAX_FORWARDED_LEN: usize = 64;

/// Middleware state: one limiter plus whether proxy headers name the client.
#[derive(Clone)]
pub struct ClientLimit {
    pub limiter: Arc<RateLimiter>,
    pub trust_proxy: bool,
}

impl ClientLimit {
    pub fn new(limiter: Arc<RateLimiter>, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

/// Count the request against the limiter, keyed by client address. Rejected
/// requests never reach the handler. Every response carries the
/// `x-ratelimit-*` headers.
pub async fn enforce(State(limit): State<ClientLimit>, req: Request, next: Next) -> Response {
    let client = client_key(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
        limit.trust_proxy,
    );
    let decision = limit.limiter.check(&client);

    let mut response = if decision.success {
        next.run(req).await
    } else {
        warn!(client = %client, path = %req.uri().path(), "rate limit exceeded");
        ApiError::RateLimited.into_response()
    };

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset));
    response
}

/// The socket peer, unless the server sits behind a trusted proxy. Then the
/// first `x-forwarded-for` hop, then `x-real-ip`, each only if it looks like
/// an address.
fn client_key(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> String {
    let forwarded = trust_proxy
        .then(|| {
            forwarded_addr(headers, "x-forwarded-for")
                .or_else(|| forwarded_addr(headers, "x-real-ip"))
        })
        .flatten();

    forwarded
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_addr(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() || first.len() > MAX_FORWARDED_LEN {
        return None;
    }
    first
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
        .then(|| first.to_string())
}

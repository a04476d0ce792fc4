//! Fixed-window request counting.
//!
//! Requests are counted per `identifier:floor(now / window)` bucket. Because
//! windows are fixed, a client can spend a full quota at the end of one window
//! and another at the start of the next.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::sweeper::Sweep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_ms: i64,
}

impl RateLimitConfig {
    pub const fn new(limit: u32, window_ms: i64) -> Self {
        Self { limit, window_ms }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rate limit {0:?}, expected <limit>/<window_ms>")]
pub struct ParseRateLimitError(String);

impl FromStr for RateLimitConfig {
    type Err = ParseRateLimitError;

    /// Parses `<limit>/<window_ms>`, e.g. `100/60000`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRateLimitError(s.to_string());
        let (limit, window) = s.split_once('/').ok_or_else(invalid)?;
        let limit: u32 = limit.trim().parse().map_err(|_| invalid())?;
        let window_ms: i64 = window.trim().parse().map_err(|_| invalid())?;
        if limit == 0 || window_ms <= 0 {
            return Err(invalid());
        }
        Ok(Self { limit, window_ms })
    }
}

/// Result of a single `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    /// End of the current window, unix milliseconds.
    pub reset: i64,
}

struct Bucket {
    window: i64,
    count: u32,
}

pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    /// One lock around the whole map serialises increments per key.
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Utc::now().timestamp_millis())
    }

    /// Count one request for `identifier` at `now_ms` and decide on it.
    pub fn check_at(&self, identifier: &str, now_ms: i64) -> RateLimitDecision {
        let RateLimitConfig { limit, window_ms } = self.config;
        let window = now_ms.div_euclid(window_ms);
        let reset = (window + 1) * window_ms;
        let key = format!("{}:{}", identifier, window);

        let count = {
            let mut buckets = self.buckets.lock();
            let bucket = buckets.entry(key).or_insert(Bucket { window, count: 0 });
            bucket.count = bucket.count.saturating_add(1);
            bucket.count
        };

        if count > limit {
            RateLimitDecision {
                success: false,
                limit,
                remaining: 0,
                reset,
            }
        } else {
            RateLimitDecision {
                success: true,
                limit,
                remaining: limit - count,
                reset,
            }
        }
    }

    /// Drop buckets whose window has already ended.
    pub fn sweep_at(&self, now_ms: i64) -> usize {
        let current = now_ms.div_euclid(self.config.window_ms);
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.window >= current);
        before - buckets.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

impl Sweep for RateLimiter {
    fn sweep(&self) -> usize {
        self.sweep_at(Utc::now().timestamp_millis())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// The three independently configured limiters.
#[derive(Clone)]
pub struct RateLimiters {
    pub api: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub upload: Arc<RateLimiter>,
}

impl RateLimiters {
    pub const DEFAULT_API: RateLimitConfig = RateLimitConfig::new(100, 60_000);
    pub const DEFAULT_AUTH: RateLimitConfig = RateLimitConfig::new(5, 15 * 60_000);
    pub const DEFAULT_UPLOAD: RateLimitConfig = RateLimitConfig::new(10, 60_000);

    pub fn new(api: RateLimitConfig, auth: RateLimitConfig, upload: RateLimitConfig) -> Self {
        Self {
            api: Arc::new(RateLimiter::new("rate_limit_api", api)),
            auth: Arc::new(RateLimiter::new("rate_limit_auth", auth)),
            upload: Arc::new(RateLimiter::new("rate_limit_upload", upload)),
        }
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new(Self::DEFAULT_API, Self::DEFAULT_AUTH, Self::DEFAULT_UPLOAD)
    }
}

//! Per-session CSRF tokens.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::sweeper::Sweep;
use crate::token::{generate_token, tokens_match};

/// Lifetime of an issued token.
pub const CSRF_TTL_SECS: i64 = 3600;

struct CsrfEntry {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Holds at most one live token per session. Issuing a new token replaces
/// the previous one; concurrent issues resolve to whichever write lands last.
pub struct CsrfStore {
    entries: Mutex<HashMap<String, CsrfEntry>>,
    ttl: Duration,
}

impl CsrfStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(CSRF_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn issue(&self, session_id: &str) -> String {
        self.issue_at(session_id, Utc::now())
    }

    pub fn issue_at(&self, session_id: &str, now: DateTime<Utc>) -> String {
        let token = generate_token();
        self.entries.lock().insert(
            session_id.to_string(),
            CsrfEntry {
                token: token.clone(),
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// True iff a live token exists for the session and equals `candidate`.
    pub fn validate(&self, session_id: &str, candidate: &str) -> bool {
        self.validate_at(session_id, candidate, Utc::now())
    }

    pub fn validate_at(&self, session_id: &str, candidate: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(session_id) {
            Some(entry) if entry.expires_at <= now => {
                entries.remove(session_id);
                false
            }
            Some(entry) => tokens_match(&entry.token, candidate),
            None => false,
        }
    }

    /// Validate and, on success, remove the token so it cannot be replayed.
    pub fn consume(&self, session_id: &str, candidate: &str) -> bool {
        self.consume_at(session_id, candidate, Utc::now())
    }

    pub fn consume_at(&self, session_id: &str, candidate: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();
        let valid = match entries.get(session_id) {
            Some(entry) => entry.expires_at > now && tokens_match(&entry.token, candidate),
            None => false,
        };
        let expired = entries
            .get(session_id)
            .is_some_and(|entry| entry.expires_at <= now);
        if valid || expired {
            entries.remove(session_id);
        }
        valid
    }

    /// Drop whatever token the session holds (logout).
    pub fn revoke(&self, session_id: &str) {
        self.entries.lock().remove(session_id);
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CsrfStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Sweep for CsrfStore {
    fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn name(&self) -> &'static str {
        "csrf"
    }
}

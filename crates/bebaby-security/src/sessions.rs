//! Admin login sessions.
//!
//! Each successful admin login gets its own random session token, carried in
//! the `admin_session` cookie and mapped here to the admin's user id, so every
//! privileged action can be attributed to a specific admin.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::sweeper::Sweep;
use crate::token::generate_token;

/// Matches the cookie's Max-Age.
pub const SESSION_TTL_SECS: i64 = 24 * 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub token: String,
    pub admin_id: Uuid,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, AdminSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(SESSION_TTL_SECS),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn create(&self, admin_id: Uuid, username: &str) -> AdminSession {
        self.create_at(admin_id, username, Utc::now())
    }

    pub fn create_at(&self, admin_id: Uuid, username: &str, now: DateTime<Utc>) -> AdminSession {
        let session = AdminSession {
            token: generate_token(),
            admin_id,
            username: username.to_string(),
            expires_at: now + self.ttl,
        };
        self.sessions
            .lock()
            .insert(session.token.clone(), session.clone());
        session
    }

    /// Look up a live session. Expired entries are removed on sight.
    pub fn get(&self, token: &str) -> Option<AdminSession> {
        self.get_at(token, Utc::now())
    }

    pub fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<AdminSession> {
        let mut sessions = self.sessions.lock();
        match sessions.get(token) {
            Some(s) if s.expires_at > now => Some(s.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) -> Option<AdminSession> {
        self.sessions.lock().remove(token)
    }

    /// End every session held by one admin, e.g. after their account is
    /// banned or deactivated.
    pub fn revoke_admin(&self, admin_id: Uuid) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.admin_id != admin_id);
        before - sessions.len()
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Sweep for SessionStore {
    fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn name(&self) -> &'static str {
        "admin_sessions"
    }
}

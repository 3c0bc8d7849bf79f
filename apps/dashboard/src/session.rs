use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use dashmap::DashMap;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "quota_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub is_admin: bool,
}

struct StoredSession {
    session: Session,
    created_at: Instant,
}

impl StoredSession {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// In-memory sessions keyed by an opaque id carried in [`SESSION_COOKIE`].
/// Entries older than the configured lifetime are treated as missing.
pub struct SessionStore {
    sessions: DashMap<String, StoredSession>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn create(&self, session: Session) -> String {
        self.prune_expired();

        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            id.clone(),
            StoredSession {
                session,
                created_at: Instant::now(),
            },
        );
        id
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        {
            let entry = self.sessions.get(id)?;
            if !entry.is_expired(self.ttl) {
                return Some(entry.session.clone());
            }
        }

        self.sessions
            .remove_if(id, |_, stored| stored.is_expired(self.ttl));
        None
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, stored)| stored.session)
    }

    /// Drops every expired entry; returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, stored| !stored.is_expired(self.ttl));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Session id from the request's `Cookie` headers, if present.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(id: &str) -> HeaderValue {
    cookie_value(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
}

pub fn clear_session_cookie() -> HeaderValue {
    cookie_value(&format!(
        "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}

fn cookie_value(raw: &str) -> HeaderValue {
    // Session ids are uuid hex, so the value is always visible ASCII.
    HeaderValue::from_str(raw).unwrap_or_else(|_| HeaderValue::from_static(""))
}

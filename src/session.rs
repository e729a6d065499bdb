//! Server-side sessions keyed by a random id carried in a cookie.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Key-value data scoped to one client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    values: HashMap<String, Value>,
}

impl Session {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Integer value under `key`, or `None` if absent or not a `u32`.
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct Entry {
    session: Session,
    last_seen: Instant,
}

/// In-memory session storage shared by all requests. Sessions not saved
/// within `ttl` are treated as gone and dropped on the next save.
#[derive(Clone)]
pub struct SessionStore {
    cookie_name: Arc<str>,
    ttl: Duration,
    sessions: Arc<Mutex<HashMap<SessionId, Entry>>>,
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cookie_name: Arc::from(cookie_name.into()),
            ttl,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the session named by the jar's session cookie, or a fresh
    /// session under a new id when the cookie is missing, unknown or expired.
    pub fn load(&self, jar: &CookieJar) -> (SessionId, Session) {
        self.load_at(jar, Instant::now())
    }

    fn load_at(&self, jar: &CookieJar, now: Instant) -> (SessionId, Session) {
        let known = jar
            .get(&self.cookie_name)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
            .and_then(|id| self.get_at(id, now).map(|session| (id, session)));

        known.unwrap_or_else(|| {
            let id = Uuid::new_v4();
            debug!(%id, "starting new session");
            (id, Session::default())
        })
    }

    /// Stores `session` under `id` and makes sure the jar carries its cookie.
    pub fn save(&self, jar: CookieJar, id: SessionId, session: Session) -> CookieJar {
        self.save_at(id, session, Instant::now());
        jar.add(self.session_cookie(id))
    }

    fn save_at(&self, id: SessionId, session: Session, now: Instant) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.ttl);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "dropped expired sessions");
        }
        sessions.insert(id, Entry { session, last_seen: now });
    }

    /// Moves `session` to a new id, discarding the old one.
    pub fn cycle(&self, jar: CookieJar, old: SessionId, session: Session) -> CookieJar {
        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&old);
        self.save_at(id, session, Instant::now());
        debug!(%old, new = %id, "cycled session id");
        jar.add(self.session_cookie(id))
    }

    /// Deletes the session and expires its cookie.
    pub fn flush(&self, jar: CookieJar, id: SessionId) -> CookieJar {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        jar.remove(Cookie::build(self.cookie_name.to_string()).path("/"))
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.get_at(id, Instant::now())
    }

    fn get_at(&self, id: SessionId, now: Instant) -> Option<Session> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .filter(|entry| now.saturating_duration_since(entry.last_seen) <= self.ttl)
            .map(|entry| entry.session.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn session_cookie(&self, id: SessionId) -> Cookie<'static> {
        Cookie::build((self.cookie_name.to_string(), id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }
}

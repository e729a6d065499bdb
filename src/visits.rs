//! Visit counting across requests.
//!
//! The session holds the running `visits` counter. The client echoes a
//! `last_visit` cookie stamped `YYYY-MM-DD HH:MM:SS.ffffff`; the trailing
//! seven characters are dropped before parsing. A visit at least one whole
//! day after the last one bumps the counter and moves the stamp forward,
//! anything sooner resets the counter to 1 and keeps the stamp as sent.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::session::Session;

pub const VISITS: &str = "visits";
pub const LAST_VISIT: &str = "last_visit";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const STORED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const SUFFIX_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedTimestamp {
    #[error("timestamp {0:?} is too short to carry a 7-character suffix")]
    TooShort(String),

    #[error("timestamp {0:?} does not match YYYY-MM-DD HH:MM:SS")]
    BadFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitState {
    pub visits: u32,
    pub last_visit: String,
}

/// The visit-related cookies sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitCookies {
    pub last_visit: Option<String>,
    pub visits: Option<String>,
}

impl From<&CookieJar> for VisitCookies {
    fn from(jar: &CookieJar) -> Self {
        Self {
            last_visit: jar.get(LAST_VISIT).map(|c| c.value().to_string()),
            visits: jar.get(VISITS).map(|c| c.value().to_string()),
        }
    }
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(STORED_FORMAT).to_string()
}

pub fn parse_last_visit(raw: &str) -> Result<NaiveDateTime, MalformedTimestamp> {
    let len = raw.chars().count();
    if len < SUFFIX_LEN {
        return Err(MalformedTimestamp::TooShort(raw.to_string()));
    }

    let head: String = raw.chars().take(len - SUFFIX_LEN).collect();
    NaiveDateTime::parse_from_str(&head, TIMESTAMP_FORMAT)
        .map_err(|_| MalformedTimestamp::BadFormat(raw.to_string()))
}

/// Derives the next visit state. Never fails: a missing or malformed
/// `last_visit` cookie is treated as a visit happening `now`.
pub fn track(session_visits: Option<u32>, cookies: &VisitCookies, now: NaiveDateTime) -> VisitState {
    if let Some(raw) = cookies.visits.as_deref() {
        debug!(cookie_visits = raw, "ignoring client visit count");
    }

    let (last_visit_raw, last_visit_time) = match cookies.last_visit.as_deref() {
        Some(raw) => match parse_last_visit(raw) {
            Ok(at) => (raw.to_string(), at),
            Err(err) => {
                debug!(%err, "discarding last_visit cookie");
                (format_timestamp(now), now)
            }
        },
        None => (format_timestamp(now), now),
    };

    if (now - last_visit_time).num_days() > 0 {
        VisitState {
            visits: session_visits.unwrap_or(1).saturating_add(1),
            last_visit: format_timestamp(now),
        }
    } else {
        VisitState {
            visits: 1,
            last_visit: last_visit_raw,
        }
    }
}

pub struct VisitTracker;

impl VisitTracker {
    /// Runs [`track`] against the session counter and writes the result back
    /// under `visits` and `last_visit`.
    pub fn apply(session: &mut Session, cookies: &VisitCookies, now: NaiveDateTime) -> VisitState {
        let state = track(session.get_u32(VISITS), cookies, now);
        session.set(VISITS, state.visits);
        session.set(LAST_VISIT, state.last_visit.clone());
        state
    }
}

impl VisitState {
    /// Mirrors the state into the client's `visits` and `last_visit` cookies.
    pub fn write_cookies(&self, jar: CookieJar) -> CookieJar {
        jar.add(
            Cookie::build((VISITS, self.visits.to_string()))
                .path("/")
                .build(),
        )
        .add(
            Cookie::build((LAST_VISIT, self.last_visit.clone()))
                .path("/")
                .build(),
        )
    }
}

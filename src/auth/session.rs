//! In-process cookie sessions for the web pages.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use serde::Serialize;

use super::oauth::OAuthTokens;
use super::random_token;
use crate::db::Id;

pub const SESSION_COOKIE: &str = "svcmap_session";

/// Idle time after which a session is dropped.
pub const SESSION_TTL: Duration = Duration::days(7);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    /// CSRF state of a login in progress
    pub oauth_state: Option<String>,
    pub user_id: Option<Id>,
    pub tokens: Option<OAuthTokens>,
    pub flash: Vec<Flash>,
    /// Last time the session was read or written
    pub last_seen: DateTime<Utc>,
}

/// Sessions keyed by the opaque id carried in [`SESSION_COOKIE`].
///
/// A session idle for longer than the store's TTL is treated as unknown and
/// removed; expired sessions are also swept whenever a new one is created.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_seen > self.ttl
    }

    /// Live session by id, with its idle clock reset.
    fn live(&self, id: &str) -> Option<RefMut<'_, String, Session>> {
        let now = Utc::now();
        if self
            .sessions
            .remove_if(id, |_, session| self.is_expired(session, now))
            .is_some()
        {
            return None;
        }
        let mut session = self.sessions.get_mut(id)?;
        session.last_seen = now;
        Some(session)
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !self.is_expired(session, now));
        before.saturating_sub(self.sessions.len())
    }

    /// Start an empty session and return its id.
    pub fn create(&self) -> String {
        self.purge_expired();
        let id = random_token();
        self.sessions.insert(
            id.clone(),
            Session {
                last_seen: Utc::now(),
                ..Session::default()
            },
        );
        id
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.live(id).map(|s| s.clone())
    }

    /// Mutate a session in place. Returns false when the session is unknown.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Session)) -> bool {
        match self.live(id) {
            Some(mut session) => {
                f(&mut session);
                true
            }
            None => false,
        }
    }

    pub fn destroy(&self, id: &str) {
        self.sessions.remove(id);
    }

    pub fn flash(&self, id: &str, kind: FlashKind, message: impl Into<String>) {
        let message = message.into();
        self.update(id, |s| s.flash.push(Flash { kind, message }));
    }

    /// Drain pending flash messages.
    pub fn take_flash(&self, id: &str) -> Vec<Flash> {
        self.live(id)
            .map(|mut s| std::mem::take(&mut s.flash))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Read the session id from the `Cookie` header(s).
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

/// `Set-Cookie` value establishing the session.
pub fn session_cookie(id: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        id,
        SESSION_TTL.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

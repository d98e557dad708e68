//! Signed cookie sessions.
//!
//! The whole session lives client-side in one cookie. Its value is the
//! base64url encoding of a small JSON payload, signed by
//! [`SignedCookieJar`]; a cookie whose signature does not verify is treated
//! as absent. The payload carries its own absolute expiry so a replayed
//! cookie stops working even if the browser ignores `Max-Age`.

use crate::models::SessionUser;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::SignedCookieJar;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

/// Session cookie name. The `__Host-` prefix pins it to this origin,
/// `Path=/` and secure transport.
pub const SESSION_COOKIE_NAME: &str = "__Host-falafel.sess";

/// Per-request session state.
///
/// Decoded once per request by [`crate::auth::middleware::load_session`]
/// and read by handlers through the extractor. Handlers never mutate it in
/// place; they return a jar from [`start`] or [`end`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<SessionUser>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<SessionUser>,
    /// Expiry, in milliseconds since the Unix epoch.
    #[serde(rename = "_expire")]
    expire: u64,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: SessionUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Read the session from a verified cookie jar.
    ///
    /// Missing, unsigned, undecodable or expired cookies all yield an
    /// anonymous session.
    pub fn from_jar(jar: &SignedCookieJar, now: SystemTime) -> Self {
        jar.get(SESSION_COOKIE_NAME)
            .and_then(|cookie| decode(cookie.value(), now))
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned().unwrap_or_default())
    }
}

/// Start a session for `user`, replacing whatever the jar held.
pub fn start(jar: SignedCookieJar, user: SessionUser, ttl_secs: u64) -> SignedCookieJar {
    let value = encode(
        &Session::authenticated(user),
        expiry_after(SystemTime::now(), ttl_secs),
    );
    jar.add(session_cookie(value, ttl_secs))
}

/// Absolute expiry `ttl_secs` after `now`, in milliseconds. Saturates.
fn expiry_after(now: SystemTime, ttl_secs: u64) -> u64 {
    millis_since_epoch(now).saturating_add(ttl_secs.saturating_mul(1000))
}

/// Clear the session. Safe to call when no session exists.
pub fn end(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(session_cookie(String::new(), 0))
}

fn session_cookie(value: String, ttl_secs: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(
            i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        ))
        .build()
}

fn encode(session: &Session, expire_ms: u64) -> String {
    let payload = SessionPayload {
        user: session.user.clone(),
        expire: expire_ms,
    };
    // Serializing a struct of strings and integers cannot fail
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    general_purpose::URL_SAFE_NO_PAD.encode(json)
}

fn decode(value: &str, now: SystemTime) -> Option<Session> {
    let json = general_purpose::URL_SAFE_NO_PAD.decode(value).ok()?;
    let payload: SessionPayload = serde_json::from_slice(&json).ok()?;
    if payload.expire <= millis_since_epoch(now) {
        return None;
    }
    Some(Session { user: payload.user })
}

fn millis_since_epoch(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

//! Application state and the session-loading middleware.

use super::session::Session;
use crate::config::Config;
use crate::render::Renderer;
use crate::storage::UserStore;
use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::Key;
use axum_extra::extract::SignedCookieJar;
use std::sync::Arc;
use std::time::SystemTime;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub renderer: Arc<Renderer>,
    pub config: Arc<Config>,
    pub session_key: Key,
}

// SignedCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.session_key.clone()
    }
}

/// Build the cookie signing key from config.
///
/// Without a configured secret a random key is generated, so sessions do
/// not survive a restart.
pub fn session_key(config: &Config) -> Result<Key, String> {
    match &config.session_key {
        Some(bytes) => {
            Key::try_from(bytes.as_slice()).map_err(|e| format!("Invalid SESSION_KEY: {}", e))
        }
        None => {
            tracing::warn!("SESSION_KEY not set, using a random key; sessions end on restart");
            let mut bytes = [0u8; 64];
            rand::fill(&mut bytes);
            Key::try_from(bytes.as_slice()).map_err(|e| format!("Key generation failed: {}", e))
        }
    }
}

/// Decode the signed session cookie and attach the [`Session`] to the request.
///
/// Runs in front of routing so guards and handlers see the same value.
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = SignedCookieJar::from_headers(request.headers(), state.session_key.clone());
    let session = Session::from_jar(&jar, SystemTime::now());
    request.extensions_mut().insert(session);
    next.run(request).await
}

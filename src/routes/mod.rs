//! Route handlers and router assembly.

pub mod auth;
pub mod dev;
pub mod pages;

use crate::auth::guard::{enforce, Guard};
use crate::auth::{load_session, AppState};
use crate::error::AppError;
use crate::middleware::security_headers;
use axum::{
    handler::HandlerWithoutStateExt,
    http::{header, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// 302 Found to `location`.
pub fn found(location: &str) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())])
}

/// Keep a caller-supplied redirect target only if it stays on this origin.
///
/// Accepts absolute paths (`/private`); rejects protocol-relative (`//host`),
/// backslash tricks and anything with a scheme.
pub fn safe_redirect(target: Option<&str>) -> Option<&str> {
    let target = target?;
    let same_origin = target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains('\\')
        && !target.chars().any(char::is_control);
    same_origin.then_some(target)
}

/// Percent-encode a redirect target for use as a query value.
///
/// `/` is left readable since it is legal in a query; everything else that
/// could end or split the value (`&`, `#`, `=`, `?`, `+`, spaces) is escaped.
pub fn encode_redir(target: &str) -> String {
    urlencoding::encode(target).replace("%2F", "/")
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// Build the full application router.
///
/// Session loading wraps every route so guards and handlers see the same
/// [`crate::auth::Session`]. Guards are attached per route. Anything that
/// matches no route is looked up in the static directory.
pub fn app(state: AppState) -> Router {
    let anonymous_only = || from_fn_with_state(Guard::anonymous(), enforce);
    let authenticated_only = || from_fn_with_state(Guard::authenticated(), enforce);

    let static_files =
        ServeDir::new(&state.config.static_dir).not_found_service(not_found.into_service());

    Router::new()
        .route("/", get(pages::index))
        .route("/public", get(pages::public))
        .route(
            "/login",
            get(pages::login)
                .post(auth::login)
                .route_layer(anonymous_only()),
        )
        .route(
            "/private",
            get(pages::private).route_layer(authenticated_only()),
        )
        .route("/logout", post(auth::logout))
        .route("/dev-live-reload.js", get(dev::live_reload_script))
        .fallback_service(static_files)
        .layer(from_fn_with_state(state.clone(), load_session))
        .layer(from_fn_with_state(state.clone(), security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_sets_location() {
        let response = found("/login?redir=/private").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login?redir=/private"
        );
    }

    #[test]
    fn test_encode_redir() {
        assert_eq!(encode_redir("/private"), "/private");
        assert_eq!(encode_redir("/a?x=1&y=2"), "/a%3Fx%3D1%26y%3D2");
        assert_eq!(encode_redir("/a b#frag"), "/a%20b%23frag");
    }

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/private")), Some("/private"));
        assert_eq!(safe_redirect(Some("/a/b?c=d")), Some("/a/b?c=d"));
        assert_eq!(safe_redirect(None), None);
        assert_eq!(safe_redirect(Some("")), None);
        assert_eq!(safe_redirect(Some("//evil.example")), None);
        assert_eq!(safe_redirect(Some("/\\evil.example")), None);
        assert_eq!(safe_redirect(Some("https://evil.example")), None);
        assert_eq!(safe_redirect(Some("private")), None);
    }
}

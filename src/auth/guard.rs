//! Route guards.
//!
//! A [`Guard`] is a predicate over the request's [`Session`] that either lets
//! the request through or names a redirect target. It never produces an
//! error status. Guards are attached per route with
//! `axum::middleware::from_fn_with_state(guard, enforce)`.

use super::session::Session;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Path of the login form authenticated-only routes send visitors to.
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Only sessions carrying a user may pass.
    ///
    /// Others go to the login form with `redir` set to the configured target,
    /// or to the current route path when none is configured.
    Authenticated { redir: Option<String> },
    /// Only sessions without a user may pass. Others go to `redir` (default `/`).
    Anonymous { redir: Option<String> },
}

/// Result of evaluating a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Pass,
    Redirect(String),
}

impl Guard {
    pub fn authenticated() -> Self {
        Guard::Authenticated { redir: None }
    }

    pub fn anonymous() -> Self {
        Guard::Anonymous { redir: None }
    }

    pub fn with_redir(self, target: impl Into<String>) -> Self {
        let redir = Some(target.into());
        match self {
            Guard::Authenticated { .. } => Guard::Authenticated { redir },
            Guard::Anonymous { .. } => Guard::Anonymous { redir },
        }
    }

    /// Decide whether a request for `route_path` may proceed.
    pub fn evaluate(&self, session: &Session, route_path: &str) -> GuardOutcome {
        match self {
            Guard::Authenticated { redir } => {
                if session.is_authenticated() {
                    GuardOutcome::Pass
                } else {
                    let back = redir.as_deref().unwrap_or(route_path);
                    GuardOutcome::Redirect(format!(
                        "{}?redir={}",
                        LOGIN_PATH,
                        crate::routes::encode_redir(back)
                    ))
                }
            }
            Guard::Anonymous { redir } => {
                if session.is_authenticated() {
                    GuardOutcome::Redirect(redir.clone().unwrap_or_else(|| "/".to_string()))
                } else {
                    GuardOutcome::Pass
                }
            }
        }
    }
}

/// Middleware applying a guard in front of a route.
pub async fn enforce(State(guard): State<Guard>, request: Request, next: Next) -> Response {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .unwrap_or_default();
    let route_path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    match guard.evaluate(&session, &route_path) {
        GuardOutcome::Pass => next.run(request).await,
        GuardOutcome::Redirect(target) => {
            tracing::debug!(route = %route_path, target = %target, "Guard redirect");
            crate::routes::found(&target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionUser;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn signed_in() -> Session {
        Session::authenticated(SessionUser {
            username: "john.doe".to_string(),
            email: "john@does.co".to_string(),
        })
    }

    #[test]
    fn test_authenticated_guard() {
        let guard = Guard::authenticated();
        assert_eq!(guard.evaluate(&signed_in(), "/private"), GuardOutcome::Pass);
        assert_eq!(
            guard.evaluate(&Session::anonymous(), "/private"),
            GuardOutcome::Redirect("/login?redir=/private".to_string())
        );
    }

    #[test]
    fn test_authenticated_guard_with_redir() {
        let guard = Guard::authenticated().with_redir("/account");
        assert_eq!(
            guard.evaluate(&Session::anonymous(), "/private"),
            GuardOutcome::Redirect("/login?redir=/account".to_string())
        );
    }

    #[test]
    fn test_redir_is_percent_encoded() {
        let guard = Guard::authenticated().with_redir("/a?x=1&y=2");
        assert_eq!(
            guard.evaluate(&Session::anonymous(), "/private"),
            GuardOutcome::Redirect("/login?redir=/a%3Fx%3D1%26y%3D2".to_string())
        );
    }

    #[test]
    fn test_anonymous_guard() {
        let guard = Guard::anonymous();
        assert_eq!(guard.evaluate(&Session::anonymous(), "/login"), GuardOutcome::Pass);
        assert_eq!(
            guard.evaluate(&signed_in(), "/login"),
            GuardOutcome::Redirect("/".to_string())
        );

        let guard = Guard::anonymous().with_redir("/private");
        assert_eq!(
            guard.evaluate(&signed_in(), "/login"),
            GuardOutcome::Redirect("/private".to_string())
        );
    }

    async fn guarded_app(guard: Guard, session: Option<Session>) -> Response {
        let app = Router::new().route(
            "/private",
            get(|| async { "secret page" })
                .route_layer(middleware::from_fn_with_state(guard, enforce)),
        );

        let mut request = axum::http::Request::builder()
            .uri("/private")
            .body(Body::empty())
            .unwrap();
        if let Some(session) = session {
            request.extensions_mut().insert(session);
        }
        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_enforce_redirects_without_session() {
        let response = guarded_app(Guard::authenticated(), None).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/login?redir=/private"
        );
    }

    #[tokio::test]
    async fn test_enforce_passes_with_session() {
        let response = guarded_app(Guard::authenticated(), Some(signed_in())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "secret page");
    }
}

//! Login and logout endpoints.

use super::{found, safe_redirect};
use crate::auth::password::verify_password_blocking;
use crate::auth::{session, AppState};
use crate::error::{AppError, FieldIssue};
use crate::models::{LoginForm, RedirQuery};
use axum::{
    extract::{FromRequest, Query, Request, State},
    http::header,
    response::IntoResponse,
    Form, Json,
};
use axum_extra::extract::SignedCookieJar;
use zeroize::Zeroizing;

/// Validated login body.
///
/// Accepts `application/json` or a URL-encoded form, picked by
/// `Content-Type`. Bodies that fail to parse or validate are rejected with
/// 422 before the handler runs.
#[derive(Debug)]
pub struct LoginBody(pub LoginForm);

impl<S> FromRequest<S> for LoginBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let form = if is_json {
            Json::<LoginForm>::from_request(req, state)
                .await
                .map(|Json(form)| form)
                .map_err(|e| malformed_body(e.body_text()))?
        } else {
            Form::<LoginForm>::from_request(req, state)
                .await
                .map(|Form(form)| form)
                .map_err(|e| malformed_body(e.body_text()))?
        };

        form.validate().map_err(AppError::Validation)?;
        Ok(LoginBody(form))
    }
}

fn malformed_body(detail: String) -> AppError {
    AppError::Validation(vec![FieldIssue::new("body", detail)])
}

/// POST /login: authenticate and start a session.
///
/// Unknown usernames and wrong passwords produce the same 403 and the same
/// log line.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<RedirQuery>,
    jar: SignedCookieJar,
    LoginBody(form): LoginBody,
) -> Result<impl IntoResponse, AppError> {
    let LoginForm { username, password } = form;
    let password = Zeroizing::new(password);

    let user = state.users.find_by_username(&username).await?;

    let verified = match &user {
        Some(user) => {
            match verify_password_blocking(password, user.password_hash.clone()).await {
                Ok(matches) => matches,
                Err(e) => {
                    tracing::error!(error = %e, user_id = %user.id, "Stored password hash unusable");
                    false
                }
            }
        }
        None => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        tracing::warn!(action = "auth_failed", username = %username, "Login failed");
        return Err(AppError::Forbidden);
    };

    tracing::info!(action = "login", username = %user.username, "User logged in");

    let jar = session::start(jar, user.profile(), state.config.session_ttl_secs);
    let target = safe_redirect(query.redir.as_deref()).unwrap_or("/");
    Ok((jar, found(target)))
}

/// POST /logout: clear the session.
///
/// Always redirects to `/`, with or without a session.
pub async fn logout(jar: SignedCookieJar) -> impl IntoResponse {
    (session::end(jar), found("/"))
}

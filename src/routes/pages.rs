//! Page handlers.

use super::{encode_redir, safe_redirect};
use crate::auth::{AppState, Session};
use crate::error::AppError;
use crate::models::{LoginPage, PrivatePage, RedirQuery, TitledPage};
use axum::{
    extract::{Query, State},
    response::Html,
};

/// GET /
pub async fn index(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    Ok(state
        .renderer
        .page("index", &TitledPage { title: "Index Page" }, &session)?)
}

/// GET /public
pub async fn public(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    Ok(state
        .renderer
        .page("public", &TitledPage { title: "Public Page" }, &session)?)
}

/// GET /login: the login form. `redir` is carried, encoded, into the form action.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<RedirQuery>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let context = LoginPage {
        title: "Login",
        redir: safe_redirect(query.redir.as_deref()).map(encode_redir),
    };
    Ok(state.renderer.page("login", &context, &session)?)
}

/// GET /private
pub async fn private(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    // Guarded route; a missing user here means the guard was not applied
    let user = session
        .user()
        .ok_or_else(|| AppError::Internal("Private page reached without a session".to_string()))?;
    let context = PrivatePage {
        title: "Private Page",
        username: user.username.clone(),
    };
    Ok(state.renderer.page("private", &context, &session)?)
}

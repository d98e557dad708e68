//! Request, session and storage models.
//!
//! Request and session models use serde; storage rows are mapped by hand.

use crate::error::FieldIssue;
use serde::{Deserialize, Serialize};

/// Minimum length of both login fields, counted in characters.
pub const LOGIN_FIELD_MIN_CHARS: usize = 3;

// ============================================================================
// Storage Models
// ============================================================================

/// User row as stored in the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl StoredUser {
    /// Public profile kept in the session: the record minus its id and hash.
    pub fn profile(&self) -> SessionUser {
        SessionUser {
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Fields needed to create a user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

// ============================================================================
// Session Models
// ============================================================================

/// Authenticated user as carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub email: String,
}

// ============================================================================
// Request Models
// ============================================================================

/// Login form body (URL-encoded or JSON).
///
/// Missing fields deserialize as empty strings so they are reported by
/// [`LoginForm::validate`] alongside too-short ones.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Check field shape. Returns every failing field, not just the first.
    pub fn validate(&self) -> Result<(), Vec<FieldIssue>> {
        let mut issues = Vec::new();
        for (field, value) in [("username", &self.username), ("password", &self.password)] {
            if value.chars().count() < LOGIN_FIELD_MIN_CHARS {
                issues.push(FieldIssue::new(
                    field,
                    format!("must be at least {} characters", LOGIN_FIELD_MIN_CHARS),
                ));
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// `?redir=` query parameter accepted by the login routes.
#[derive(Debug, Default, Deserialize)]
pub struct RedirQuery {
    pub redir: Option<String>,
}

// ============================================================================
// Page Models
// ============================================================================

/// Render context for pages that only carry a title.
#[derive(Debug, Serialize)]
pub struct TitledPage {
    pub title: &'static str,
}

/// Render context for the login form.
#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub title: &'static str,
    pub redir: Option<String>,
}

/// Render context for the private page.
#[derive(Debug, Serialize)]
pub struct PrivatePage {
    pub title: &'static str,
    pub username: String,
}

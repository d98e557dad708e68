//! On-disk credential storage.
//!
//! Users live in a single SQLite database file, one row per user keyed by a
//! generated id and looked up by username.

pub mod user;

pub use user::UserStore;

/// Error type for credential store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Store task failed: {0}")]
    Task(String),
}

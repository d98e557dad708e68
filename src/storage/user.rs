//! SQLite-backed user store.
//!
//! Table `users`: id, username (unique, exact match), email, password_hash,
//! created_at. `password_hash` is never a plaintext password.
//!
//! ## Concurrency
//!
//! One connection behind a mutex. Every query runs on the blocking pool so
//! handlers awaiting the store never stall the runtime.

use super::StoreError;
use crate::models::{NewUser, StoredUser};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of generated user ids.
const ID_LEN: usize = 16;

/// Credential store backed by one database file.
pub struct UserStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore").field("path", &self.path).finish()
    }
}

impl UserStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let db_path = path.clone();

        let conn = tokio::task::spawn_blocking(move || open_connection(&db_path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        tracing::debug!(path = %path.display(), "Credential store opened");

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find exactly one user by exact username match.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, StoreError> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, email, password_hash FROM users WHERE username = ?1",
                    params![username],
                    |row| {
                        Ok(StoredUser {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            email: row.get(2)?,
                            password_hash: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    /// Number of users in the store.
    pub async fn len(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Insert a new user with a generated id.
    ///
    /// Fails with [`StoreError::DuplicateUsername`] if the username exists.
    pub async fn insert(&self, new_user: NewUser) -> Result<StoredUser, StoreError> {
        self.with_conn(move |conn| {
            let user = StoredUser {
                id: nanoid::nanoid!(ID_LEN),
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
            };

            let result = conn.execute(
                "INSERT INTO users (id, username, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.password_hash,
                    epoch_secs()
                ],
            );

            match result {
                Ok(_) => Ok(user),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::DuplicateUsername(user.username))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Remove a user by username.
    ///
    /// Returns true if the user was removed, false if it didn't exist.
    pub async fn remove_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;
            Ok(removed > 0)
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;

    // WAL mode for concurrent reads + crash safety
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    )?;

    Ok(conn)
}

fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

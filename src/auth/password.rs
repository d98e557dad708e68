//! Password hashing and verification.
//!
//! Stored hashes are either Argon2 PHC strings (`$argon2id$...`) or bcrypt
//! (`$2a$`, `$2b$`, `$2y$`). New hashes are always Argon2id with the crate
//! defaults (m=19456, t=2, p=1).

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use zeroize::Zeroizing;

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Unrecognized password hash format")]
    UnknownFormat,

    #[error("Malformed password hash: {0}")]
    Malformed(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Hash a password with Argon2id and a random 16-byte salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; 16];
    rand::fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Compare a plaintext password against a stored hash.
///
/// # Returns
/// * `Ok(true)` if the password matches
/// * `Ok(false)` if it does not
/// * `Err(PasswordError)` if the stored hash cannot be interpreted
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    if BCRYPT_PREFIXES.iter().any(|p| stored_hash.starts_with(p)) {
        return bcrypt::verify(password, stored_hash)
            .map_err(|e| PasswordError::Malformed(e.to_string()));
    }

    if stored_hash.starts_with("$argon2") {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| PasswordError::Malformed(e.to_string()))?;
        if parsed.hash.is_none() {
            return Err(PasswordError::Malformed("missing hash output".to_string()));
        }
        return match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Malformed(e.to_string())),
        };
    }

    Err(PasswordError::UnknownFormat)
}

/// Verify on the blocking pool so slow hashing does not stall the runtime.
///
/// The plaintext copy handed to the worker is zeroized when it is dropped.
pub async fn verify_password_blocking(
    password: Zeroizing<String>,
    stored_hash: String,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| PasswordError::Hash(format!("verification task failed: {}", e)))?
}

use base64::{engine::general_purpose, Engine as _};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Minimum length of the cookie signing secret, in bytes.
pub const SESSION_KEY_MIN_BYTES: usize = 64;

/// Longest accepted session lifetime: ten years.
pub const SESSION_TTL_MAX_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,

    // Credential store
    pub users_db_path: PathBuf,

    // TLS
    pub tls_cert_path: PathBuf,
    pub tls_key_path: PathBuf,

    // Sessions
    pub session_key: Option<Vec<u8>>,
    pub session_ttl_secs: u64,

    // Development
    pub dev_mode: bool,
    pub live_reload_addr: SocketAddr,
    pub live_reload_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("static_dir", &self.static_dir)
            .field("users_db_path", &self.users_db_path)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field(
                "session_key",
                &self.session_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("dev_mode", &self.dev_mode)
            .field("live_reload_addr", &self.live_reload_addr)
            .field("live_reload_url", &self.live_reload_url)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is fine, variables may be set directly
        let _ = dotenvy::dotenv();

        let bind_addr =
            parse_env_or_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 4430)))?;
        let static_dir = path_env_or_default("STATIC_DIR", "public");

        let users_db_path = path_env_or_default("USERS_DB_PATH", ".data/users.db");

        let tls_cert_path = path_env_or_default("TLS_CERT_PATH", "cert/falafel.localhost.crt");
        let tls_key_path = path_env_or_default("TLS_KEY_PATH", "cert/falafel.localhost.key");

        let session_key = match env::var("SESSION_KEY") {
            Ok(encoded) => Some(decode_session_key(&encoded)?),
            Err(_) => None,
        };
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if session_ttl_secs > SESSION_TTL_MAX_SECS {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                format!("must be at most {}", SESSION_TTL_MAX_SECS),
            ));
        }

        let dev_mode = parse_env_or_default("DEV_MODE", false)?;
        let live_reload_addr =
            parse_env_or_default("LIVE_RELOAD_ADDR", SocketAddr::from(([127, 0, 0, 1], 4431)))?;
        let live_reload_url = env::var("LIVE_RELOAD_URL")
            .unwrap_or_else(|_| "ws://falafel.localhost:4431".to_string());
        if !live_reload_url.starts_with("ws://") && !live_reload_url.starts_with("wss://") {
            return Err(ConfigError::InvalidValue(
                "LIVE_RELOAD_URL".to_string(),
                "must use the ws:// or wss:// scheme".to_string(),
            ));
        }

        Ok(Config {
            bind_addr,
            static_dir,
            users_db_path,
            tls_cert_path,
            tls_key_path,
            session_key,
            session_ttl_secs,
            dev_mode,
            live_reload_addr,
            live_reload_url,
        })
    }

    /// Origin the live-reload script connects to, as it appears in a CSP source list.
    pub fn live_reload_origin(&self) -> &str {
        let url = self.live_reload_url.as_str();
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
        match url[scheme_end..].find('/') {
            Some(path_start) => &url[..scheme_end + path_start],
            None => url,
        }
    }
}

fn decode_session_key(encoded: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| {
            ConfigError::InvalidValue("SESSION_KEY".to_string(), format!("invalid base64: {}", e))
        })?;
    if bytes.len() < SESSION_KEY_MIN_BYTES {
        return Err(ConfigError::InvalidValue(
            "SESSION_KEY".to_string(),
            format!(
                "expected at least {} bytes, got {}",
                SESSION_KEY_MIN_BYTES,
                bytes.len()
            ),
        ));
    }
    Ok(bytes)
}

fn path_env_or_default(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

//! Security headers middleware.

use crate::auth::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

/// Build the Content Security Policy for this deployment.
///
/// Everything is same-origin. Dev mode additionally allows the live-reload
/// socket in `connect-src`.
pub fn content_security_policy(dev_socket_origin: Option<&str>) -> String {
    let connect_src = match dev_socket_origin {
        Some(origin) => format!("connect-src 'self' {}", origin),
        None => "connect-src 'self'".to_string(),
    };
    format!(
        "default-src 'self'; \
         script-src 'self'; \
         style-src 'self'; \
         {}; \
         object-src 'none'; \
         frame-ancestors 'none'; \
         base-uri 'self'; \
         form-action 'self'",
        connect_src
    )
}

/// Middleware that adds security headers to all responses.
///
/// - **Strict-Transport-Security**: the server only speaks HTTPS.
/// - **X-Content-Type-Options / X-Frame-Options / Referrer-Policy /
///   Permissions-Policy**: the usual hardening set.
/// - **Content-Security-Policy**: see [`content_security_policy`].
/// - **Cache-Control: no-store** unless the handler chose its own caching,
///   so pages rendered for a signed-in user are never cached.
pub async fn security_headers(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers
        .entry("cache-control")
        .or_insert(HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("camera=(), microphone=(), geolocation=(), payment=()"),
    );

    let dev_socket = state
        .config
        .dev_mode
        .then(|| state.config.live_reload_origin());
    match HeaderValue::from_str(&content_security_policy(dev_socket)) {
        Ok(csp) => {
            headers.insert("content-security-policy", csp);
        }
        Err(e) => tracing::error!(error = %e, "Unrepresentable Content-Security-Policy"),
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_same_origin_only() {
        let csp = content_security_policy(None);
        assert!(csp.contains("default-src 'self'"));
        assert!(csp.contains("script-src 'self';"));
        assert!(csp.contains("connect-src 'self';"));
        assert!(csp.contains("object-src 'none'"));
        assert!(csp.contains("frame-ancestors 'none'"));
        assert!(csp.contains("form-action 'self'"));
        assert!(!csp.contains("ws://"));
    }

    #[test]
    fn test_csp_allows_live_reload_socket() {
        let csp = content_security_policy(Some("ws://falafel.localhost:4431"));
        assert!(csp.contains("connect-src 'self' ws://falafel.localhost:4431;"));
    }
}

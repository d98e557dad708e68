//! Development live-reload script.

use crate::auth::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
};

/// Seconds the browser may cache the script.
const SCRIPT_MAX_AGE: &str = "max-age=31536";

/// Browser side of live reload.
///
/// Opens a WebSocket to `socket_url`. When it closes, retries every second;
/// the first successful reconnect after a close reloads the page.
pub fn reload_script(socket_url: &str) -> String {
    // A JSON string is a valid JS string literal
    let url = serde_json::Value::String(socket_url.to_string()).to_string();
    format!(
        r#"(() => {{
  const url = {url};
  let closed = false;
  const connect = () => {{
    const socket = new WebSocket(url);
    socket.addEventListener("open", () => {{
      if (closed) location.reload();
    }});
    socket.addEventListener("close", () => {{
      closed = true;
      setTimeout(connect, 1000);
    }});
  }};
  connect();
}})();
"#
    )
}

/// GET /dev-live-reload.js
///
/// Empty outside dev mode so the layout's script tag is harmless.
pub async fn live_reload_script(State(state): State<AppState>) -> impl IntoResponse {
    let body = if state.config.dev_mode {
        reload_script(&state.config.live_reload_url)
    } else {
        String::new()
    };
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/javascript"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static(SCRIPT_MAX_AGE)),
        ],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_targets_socket() {
        let script = reload_script("ws://falafel.localhost:4431");
        assert!(script.contains(r#"const url = "ws://falafel.localhost:4431";"#));
        assert!(script.contains("setTimeout(connect, 1000)"));
        assert!(script.contains("location.reload()"));
    }

    #[test]
    fn test_script_url_is_quoted() {
        let script = reload_script(r#"ws://x/"</script>"#);
        assert!(script.contains(r#"const url = "ws://x/\"</script>";"#));
    }
}

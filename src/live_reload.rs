//! Development live-reload socket.
//!
//! Browsers running the reload script keep a WebSocket open here. The
//! socket carries no messages; its only signal is that it closes when the
//! process exits and accepts again once the server is back.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;

pub fn router() -> Router {
    Router::new().route("/", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(hold_open)
}

/// Keep the connection until the browser goes away.
async fn hold_open(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}

/// Serve the reload socket on plain TCP until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Live reload listening on ws://{}", addr);
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::websocket_broker::WebSocketBroker;

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<WebSocketBroker>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| state.broker.add_client(socket))
}

pub fn router(broker: Arc<WebSocketBroker>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(AppState { broker })
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Binds the listening socket. Failing here is a startup failure.
pub async fn bind(addr: &str) -> anyhow::Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    Ok((listener, local))
}

/// Serves WebSocket clients until `shutdown` is cancelled.
pub async fn run(
    listener: TcpListener,
    broker: Arc<WebSocketBroker>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(broker).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("WebSocket server stopped");
    Ok(())
}

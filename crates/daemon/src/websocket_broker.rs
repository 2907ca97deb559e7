use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use pipeline::Broadcaster;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const WEBSOCKET_BUFFER_SIZE: usize = 100;

/// Fans snapshot payloads out to every connected WebSocket client.
///
/// Payloads enter through [`Broadcaster::broadcast`], which never blocks and
/// can be called from the acquisition thread. Each client drains its own
/// receiver in a forwarding task; a client that falls behind skips the
/// messages it missed.
pub struct WebSocketBroker {
    tx: broadcast::Sender<Arc<str>>,
}

impl WebSocketBroker {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Clients currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Serves one client until it closes or the socket fails.
    pub async fn add_client(self: Arc<Self>, ws: WebSocket) {
        let client_id = Uuid::new_v4();
        let mut rx = self.tx.subscribe();
        let (mut ws_tx, mut ws_rx) = ws.split();
        info!(%client_id, clients = self.subscriber_count(), "Client connected");

        loop {
            tokio::select! {
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(%client_id, "WebSocket receive error: {}", e);
                        break;
                    }
                },
                outgoing = rx.recv() => match outgoing {
                    Ok(payload) => {
                        if ws_tx.send(Message::Text(payload.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%client_id, skipped, "Client lagging, dropped snapshots");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        drop(rx);
        info!(%client_id, clients = self.subscriber_count(), "Client disconnected");
    }
}

impl Broadcaster for WebSocketBroker {
    fn broadcast(&self, payload: String) -> usize {
        // An error only means nobody is listening.
        self.tx.send(Arc::from(payload)).unwrap_or(0)
    }
}

//! JSON-RPC over WebSocket.
//!
//! Every text frame is one request; each is answered on the same
//! connection. Calls run concurrently, so a slow format listing does not
//! hold up a progress poll.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::rpc::{handle_raw, RpcResponse};
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL};
use crate::state::AppState;

/// Responses waiting to be written, per connection.
const OUTBOX_CAPACITY: usize = 64;

/// First frame sent on every connection.
#[derive(Debug, Serialize)]
struct Greeting {
    status: &'static str,
}

/// WebSocket upgrade handler.
pub async fn rpc_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<RpcResponse>(OUTBOX_CAPACITY);

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!("RPC WebSocket client connected");

    // Forward responses to this client
    let send_task = tokio::spawn(async move {
        match serde_json::to_string(&Greeting {
            status: "connected",
        }) {
            Ok(json) => {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(e) => error!("Failed to serialize greeting: {}", e),
        }

        while let Some(response) = rx.recv().await {
            match serde_json::to_string(&response) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize RpcResponse: {}", e),
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let state = Arc::clone(&state);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response = handle_raw(state.service(), text.as_str()).await;
                    let _ = tx.send(response).await;
                });
            }
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(_) => {
                // Ping/pong is handled by axum; binary frames are ignored
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // Clean up
    drop(tx);
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("RPC WebSocket client disconnected");
}

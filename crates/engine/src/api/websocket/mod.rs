//! WebSocket handling for game clients.
//!
//! One task per socket. The first frame must authenticate within the
//! configured window; every later frame is decoded into a packet and
//! dispatched before the next one is read, which keeps per-connection order.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use snowball_domain::ConnectionId;
use snowball_shared::{ops, AuthData, AuthResponse, CloseCode, Packet};

use super::connections::{ConnectionError, Outbound};
use crate::app::App;
use crate::dispatch::{AuthError, DispatchError, DispatchOutcome};

mod ws_core;
mod ws_game;
mod ws_message;
mod ws_player;
mod ws_room;
mod ws_waddle;

#[cfg(test)]
mod test_support;

pub use ws_core::{register_handlers, HandlerDeps};

/// How long the forwarding task gets to flush after the socket loop ends.
const SEND_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<Arc<App>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, app: Arc<App>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = ConnectionId::new();
    let namespace = app.config.namespace.clone();

    // Bounded channel feeding this socket
    let (tx, mut rx) = mpsc::channel::<Outbound>(app.config.channel_buffer);
    let closed = app.connections.register(connection_id, tx);

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    // Forward queued packets to the socket
    let send_task = tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            match item {
                Outbound::Packet(packet) => match packet.to_json() {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(connection_id = %connection_id, error = %e, "Dropping unencodable packet");
                    }
                },
                Outbound::Close(code) => {
                    let frame = CloseFrame {
                        code: code.as_u16(),
                        reason: code.reason().into(),
                    };
                    let _ = ws_sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    if authenticate(&app, connection_id, &mut ws_receiver, &namespace).await {
        loop {
            let frame = tokio::select! {
                biased;
                _ = closed.cancelled() => break,
                frame = next_frame(&mut ws_receiver) => frame,
            };
            let Some(text) = frame else {
                break;
            };

            match Packet::from_json(&text) {
                Ok(packet) => {
                    let outcome = app
                        .lifecycle
                        .on_message(connection_id, packet, &namespace)
                        .await;
                    if let DispatchOutcome::Disconnected(_) = outcome {
                        break;
                    }
                }
                Err(e) => {
                    app.lifecycle
                        .on_malformed(connection_id, e.to_string(), &namespace)
                        .await;
                    break;
                }
            }
        }
    }

    // Clean up
    app.lifecycle.on_disconnect(connection_id, &namespace).await;
    app.connections.unregister(connection_id);

    let abort = send_task.abort_handle();
    if tokio::time::timeout(SEND_DRAIN_TIMEOUT, send_task).await.is_err() {
        tracing::warn!(connection_id = %connection_id, "Outbound queue did not drain, aborting");
        abort.abort();
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection terminated");
}

/// Run the auth handshake. Returns whether the connection may proceed.
async fn authenticate(
    app: &App,
    connection_id: ConnectionId,
    receiver: &mut SplitStream<WebSocket>,
    namespace: &str,
) -> bool {
    let first = tokio::time::timeout(app.config.auth_timeout, next_frame(receiver)).await;
    let result = match first {
        Err(_) => Err(DispatchError::Auth(AuthError::Timeout)),
        // Gone before saying anything
        Ok(None) => return false,
        Ok(Some(text)) => match Packet::from_json(&text) {
            Ok(packet) if packet.op == ops::AUTH => match packet.decode::<AuthData>() {
                Ok(auth) => {
                    app.lifecycle
                        .on_connect(connection_id, auth, namespace)
                        .await
                }
                Err(e) => Err(DispatchError::Protocol(e.to_string())),
            },
            Ok(packet) => {
                tracing::debug!(connection_id = %connection_id, op = %packet.op, "Expected auth as first packet");
                Err(DispatchError::Auth(AuthError::Missing))
            }
            Err(e) => Err(DispatchError::Protocol(e.to_string())),
        },
    };

    match result {
        Ok(user_id) => {
            let ack = Packet::new(ops::AUTH, AuthResponse { user_id })
                .map_err(|e| DispatchError::internal(e.to_string()))
                .and_then(|packet| {
                    app.connections
                        .send(connection_id, packet)
                        .map_err(|e| connection_error(connection_id, e))
                });
            if let Err(e) = ack {
                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to acknowledge auth");
            }
            true
        }
        Err(error) => {
            let outcome = app
                .dispatcher
                .report(connection_id, namespace, ops::AUTH, error)
                .await;
            if !matches!(outcome, DispatchOutcome::Disconnected(_)) {
                let _ = app
                    .connections
                    .close(connection_id, CloseCode::AuthenticationFailed);
            }
            false
        }
    }
}

/// Next text frame, or `None` once the client is gone.
async fn next_frame(receiver: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => {
                return Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            Ok(Message::Close(_)) => {
                tracing::debug!("WebSocket closed by client");
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket receive error");
                return None;
            }
        }
    }
    None
}

fn connection_error(connection_id: ConnectionId, error: ConnectionError) -> DispatchError {
    match error {
        ConnectionError::NotFound => DispatchError::not_found("connection", connection_id),
        ConnectionError::SendFailed => {
            DispatchError::internal(format!("outbound queue rejected packet for {connection_id}"))
        }
    }
}

use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use crate::AppState;
use crate::models::{ClientMessage, ConnectionId};
use crate::services::RoomSyncService;
use crate::websocket::msg_change_handler::handle_content_changed_message;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::websocket::msg_sync_handler::{handle_request_sync_message, handle_sync_content_message};
use crate::websocket::teardown::TeardownGuard;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.max_message_size(app_state.config.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let service = Arc::clone(&app_state.service);

    // The coordinator assigns the connection identifier and greets the client with it
    let (connection_id, mut events) = service.connect();
    let _teardown = TeardownGuard::new(Arc::clone(&service), connection_id.clone());
    info!("WebSocket connection established with connection_id: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Drain the outbound queue of this connection into the socket
    let send_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event for {}: {}", send_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                debug!("Socket for {} no longer writable", send_id);
                break;
            }
        }
    });

    // Events of one connection are handled serially, in arrival order
    let recv_id = connection_id.clone();
    let recv_service = Arc::clone(&service);
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(reason)) => {
                    debug!("WebSocket close from {}: {:?}", recv_id, reason);
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!("WebSocket error from {}: {}", recv_id, e);
                    break;
                }
            };

            let msg: ClientMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    error!("Failed to parse message from {}: {}", recv_id, e);
                    recv_service.notify_error(&recv_id, format!("malformed message: {e}"));
                    continue;
                }
            };

            dispatch(&recv_service, &recv_id, msg).await;
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
    info!("WebSocket connection {} terminated", connection_id);
}

/// Route one decoded client message to its handler
pub async fn dispatch(service: &RoomSyncService, connection_id: &ConnectionId, msg: ClientMessage) {
    match msg {
        ClientMessage::Join(join_msg) => {
            handle_join_message(join_msg, connection_id, service).await;
        }
        ClientMessage::RequestSync(request_msg) => {
            handle_request_sync_message(&request_msg, connection_id, service).await;
        }
        ClientMessage::SyncContent(sync_msg) => {
            handle_sync_content_message(sync_msg, connection_id, service).await;
        }
        ClientMessage::ContentChanged(change_msg) => {
            handle_content_changed_message(change_msg, connection_id, service).await;
        }
        ClientMessage::Ping(ping_msg) => {
            handle_ping_message(&ping_msg, connection_id, service);
        }
    }
}

use chrono::Utc;
use tracing::debug;

use crate::models::{ConnectionId, PingMessage, PongEvent, ServerEvent};
use crate::services::RoomSyncService;

/// Handle PingMessage
pub fn handle_ping_message(_ping_msg: &PingMessage, connection_id: &ConnectionId, service: &RoomSyncService) {
    // Reply with pong
    debug!("Ping message received from {}", connection_id);
    let pong = ServerEvent::Pong(PongEvent { date: Utc::now().to_rfc3339() });
    service.send_to(connection_id, pong);
}

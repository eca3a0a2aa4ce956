use tracing::{info, warn};

use crate::models::{ConnectionId, JoinMessage};
use crate::services::RoomSyncService;

/// Handle JoinMessage
pub async fn handle_join_message(join_msg: JoinMessage, connection_id: &ConnectionId, service: &RoomSyncService) {
    info!("Join requested by {}: room={}, name={}", connection_id, join_msg.room_key, join_msg.display_name);

    if let Err(e) = service
        .join(connection_id, join_msg.room_key, join_msg.display_name)
        .await
    {
        warn!("Join rejected for {}: {}", connection_id, e);
        service.notify_error(connection_id, e.to_string());
    }
}

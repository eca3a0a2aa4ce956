use tracing::{debug, warn};

use crate::models::{ConnectionId, ContentChangedMessage};
use crate::services::RoomSyncService;

/// Handle ContentChangedMessage - broadcast to the room minus the origin
pub async fn handle_content_changed_message(change_msg: ContentChangedMessage, connection_id: &ConnectionId, service: &RoomSyncService) {
    let room_key = change_msg.room_key.clone();
    match service
        .content_changed(connection_id, change_msg.room_key, change_msg.content)
        .await
    {
        Ok(n) => debug!("Change from {} in room {} fanned out to {} peer(s)", connection_id, room_key, n),
        Err(e) => {
            warn!("Change from {} rejected: {}", connection_id, e);
            service.notify_error(connection_id, e.to_string());
        }
    }
}

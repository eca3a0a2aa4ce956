use tracing::debug;

use crate::models::{ConnectionId, RequestSyncMessage, SyncContentMessage};
use crate::services::RoomSyncService;

/// Handle RequestSyncMessage - a joiner asks one peer for its content
pub async fn handle_request_sync_message(request_msg: &RequestSyncMessage, connection_id: &ConnectionId, service: &RoomSyncService) {
    debug!("Sync requested by {} from {}", connection_id, request_msg.target_connection_id);
    service
        .request_sync(connection_id, &request_msg.target_connection_id)
        .await;
}

/// Handle SyncContentMessage - a peer answers a joiner point-to-point
pub async fn handle_sync_content_message(sync_msg: SyncContentMessage, connection_id: &ConnectionId, service: &RoomSyncService) {
    debug!(
        "Sync content from {} to {} ({} bytes)",
        connection_id,
        sync_msg.target_connection_id,
        sync_msg.content.len()
    );
    service
        .sync_content(connection_id, sync_msg.content, &sync_msg.target_connection_id)
        .await;
}

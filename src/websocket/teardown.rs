use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::error;

use crate::models::ConnectionId;
use crate::services::RoomSyncService;

/// Runs the leave protocol for a connection when the socket handler goes away,
/// whether it returned normally, panicked or was cancelled.
pub struct TeardownGuard {
    service: Arc<RoomSyncService>,
    connection_id: Option<ConnectionId>,
}

impl TeardownGuard {
    pub fn new(service: Arc<RoomSyncService>, connection_id: ConnectionId) -> Self {
        Self {
            service,
            connection_id: Some(connection_id),
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let Some(connection_id) = self.connection_id.take() else {
            return;
        };
        let service = Arc::clone(&self.service);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    service.disconnect(&connection_id).await;
                });
            }
            Err(_) => error!("No runtime available to tear down connection {}", connection_id),
        }
    }
}

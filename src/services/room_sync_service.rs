use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::models::{
    ConnectedEvent, ConnectionId, ContentChangedEvent, ErrorEvent, JoinedEvent, LeftEvent, Member,
    RoomKey, ServerEvent, SyncRequestedEvent,
};
use crate::services::room_directory::{Departure, DirectoryError, RoomDirectory};

pub type EventSender = mpsc::Sender<ServerEvent>;
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomSyncError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("connection {connection_id} is not a member of room {room_key}")]
    NotAMember {
        connection_id: ConnectionId,
        room_key: RoomKey,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStats {
    pub connections: usize,
    pub joined: usize,
    pub rooms: usize,
}

/// Every member of the room except the origin, in join order.
pub fn broadcast_recipients(members: &[Member], origin: &ConnectionId) -> Vec<ConnectionId> {
    members
        .iter()
        .filter(|m| &m.connection_id != origin)
        .map(|m| m.connection_id.clone())
        .collect()
}

/// Coordinator for room membership, sync routing and change fan-out.
///
/// The directory lock is held while announcements are enqueued, so every
/// member observes joins and leaves of a room in directory order. Enqueueing
/// never waits on the recipient: a connection whose queue is full loses its
/// queue, which closes its socket and runs the leave protocol.
pub struct RoomSyncService {
    directory: Mutex<RoomDirectory>,
    connections: DashMap<ConnectionId, EventSender>,
    queue_capacity: usize,
}

impl Default for RoomSyncService {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomSyncService {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            directory: Mutex::new(RoomDirectory::new()),
            connections: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new transport connection and greet it with its identifier.
    pub fn connect(&self) -> (ConnectionId, EventReceiver) {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let _ = tx.try_send(ServerEvent::Connected(ConnectedEvent {
            connection_id: connection_id.clone(),
        }));
        self.connections.insert(connection_id.clone(), tx);
        debug!("Connection {} registered", connection_id);
        (connection_id, rx)
    }

    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        room_key: RoomKey,
        display_name: String,
    ) -> Result<(), RoomSyncError> {
        if !self.connections.contains_key(connection_id) {
            return Err(RoomSyncError::UnknownConnection(connection_id.clone()));
        }

        let mut directory = self.directory.lock().await;
        let outcome = directory.join(room_key.clone(), connection_id.clone(), display_name.clone())?;

        if let Some(previous) = outcome.previous {
            self.announce_departure(&previous);
        }

        info!(
            "{} ({}) joined room {} with {} member(s)",
            display_name,
            connection_id,
            room_key,
            outcome.members.len()
        );

        let event = ServerEvent::Joined(JoinedEvent {
            members: outcome.members.clone(),
            joined_display_name: display_name,
            joined_connection_id: connection_id.clone(),
        });
        for member in &outcome.members {
            self.send_to(&member.connection_id, event.clone());
        }

        Ok(())
    }

    /// Ask one member of the requester's room to send its content to the requester.
    pub async fn request_sync(&self, requester: &ConnectionId, target: &ConnectionId) {
        let directory = self.directory.lock().await;
        if !Self::shares_room(&directory, requester, target) {
            debug!("Dropping sync request from {} to stale target {}", requester, target);
            return;
        }

        self.send_to(
            target,
            ServerEvent::SyncRequested(SyncRequestedEvent {
                requester_connection_id: requester.clone(),
            }),
        );
    }

    /// Deliver content point-to-point to one member of the sender's room.
    pub async fn sync_content(&self, origin: &ConnectionId, content: String, target: &ConnectionId) {
        let directory = self.directory.lock().await;
        if !Self::shares_room(&directory, origin, target) {
            debug!("Dropping sync content from {} to stale target {}", origin, target);
            return;
        }
        let Some(room_key) = directory.room_of(origin).cloned() else {
            return;
        };

        self.send_to(
            target,
            ServerEvent::ContentChanged(ContentChangedEvent {
                room_key,
                content,
                origin_connection_id: origin.clone(),
            }),
        );
    }

    /// Fan a change out to every member of the room except its origin.
    /// Returns the number of recipients.
    pub async fn content_changed(
        &self,
        origin: &ConnectionId,
        room_key: RoomKey,
        content: String,
    ) -> Result<usize, RoomSyncError> {
        let directory = self.directory.lock().await;
        if directory.room_of(origin) != Some(&room_key) {
            return Err(RoomSyncError::NotAMember {
                connection_id: origin.clone(),
                room_key,
            });
        }

        let recipients = broadcast_recipients(&directory.list_members(&room_key), origin);
        let event = ServerEvent::ContentChanged(ContentChangedEvent {
            room_key,
            content,
            origin_connection_id: origin.clone(),
        });
        for recipient in &recipients {
            self.send_to(recipient, event.clone());
        }

        Ok(recipients.len())
    }

    /// Tear down a connection and announce its departure to the rest of its room.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let mut directory = self.directory.lock().await;
        let departure = directory.leave(connection_id);
        self.connections.remove(connection_id);

        match departure {
            Some(departure) => {
                info!(
                    "{} ({}) left room {}, {} member(s) remain",
                    departure.member.display_name,
                    connection_id,
                    departure.room_key,
                    departure.remaining.len()
                );
                self.announce_departure(&departure);
            }
            None => debug!("Connection {} closed without joining a room", connection_id),
        }
    }

    pub async fn list_members(&self, room_key: &RoomKey) -> Vec<Member> {
        self.directory.lock().await.list_members(room_key)
    }

    pub async fn stats(&self) -> ServiceStats {
        let directory = self.directory.lock().await;
        ServiceStats {
            connections: self.connections.len(),
            joined: directory.member_count(),
            rooms: directory.room_count(),
        }
    }

    pub fn notify_error(&self, connection_id: &ConnectionId, message: impl Into<String>) {
        self.send_to(
            connection_id,
            ServerEvent::Error(ErrorEvent {
                message: message.into(),
            }),
        );
    }

    /// Enqueue an event for one connection. Returns false if the connection is
    /// gone or was dropped for falling behind.
    pub fn send_to(&self, connection_id: &ConnectionId, event: ServerEvent) -> bool {
        let sent = match self.connections.get(connection_id) {
            Some(tx) => tx.try_send(event),
            None => {
                debug!("No outbound queue for connection {}", connection_id);
                return false;
            }
        };

        match sent {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Outbound queue of {} is full, dropping the connection",
                    connection_id
                );
                self.connections.remove(connection_id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn announce_departure(&self, departure: &Departure) {
        let event = ServerEvent::Left(LeftEvent {
            connection_id: departure.member.connection_id.clone(),
            display_name: departure.member.display_name.clone(),
        });
        for member in &departure.remaining {
            self.send_to(&member.connection_id, event.clone());
        }
    }

    fn shares_room(directory: &RoomDirectory, a: &ConnectionId, b: &ConnectionId) -> bool {
        if a == b {
            return false;
        }
        match (directory.room_of(a), directory.room_of(b)) {
            (Some(room_a), Some(room_b)) => room_a == room_b,
            _ => false,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Transport-assigned handle for one live connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn generate() -> Self {
        ConnectionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        ConnectionId(value.to_string())
    }
}

/// Opaque room key chosen by whoever shares the room.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, ToSchema)]
#[serde(transparent)]
pub struct RoomKey(pub String);

impl RoomKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomKey {
    fn from(value: &str) -> Self {
        RoomKey(value.to_string())
    }
}

/// One entry of a membership snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

// Client -> server payloads

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub room_key: RoomKey,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestSyncMessage {
    pub target_connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncContentMessage {
    pub content: String,
    pub target_connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentChangedMessage {
    pub room_key: RoomKey,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PingMessage {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "requestSync")]
    RequestSync(RequestSyncMessage),
    #[serde(rename = "syncContent")]
    SyncContent(SyncContentMessage),
    #[serde(rename = "contentChanged")]
    ContentChanged(ContentChangedMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

// Server -> client payloads

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedEvent {
    pub members: Vec<Member>,
    pub joined_display_name: String,
    pub joined_connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequestedEvent {
    pub requester_connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentChangedEvent {
    pub room_key: RoomKey,
    pub content: String,
    pub origin_connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeftEvent {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PongEvent {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected(ConnectedEvent),
    #[serde(rename = "joined")]
    Joined(JoinedEvent),
    #[serde(rename = "syncRequested")]
    SyncRequested(SyncRequestedEvent),
    #[serde(rename = "contentChanged")]
    ContentChanged(ContentChangedEvent),
    #[serde(rename = "left")]
    Left(LeftEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "pong")]
    Pong(PongEvent),
}

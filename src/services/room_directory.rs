use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::models::{ConnectionId, Member, RoomKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("room key must not be empty")]
    EmptyRoomKey,
}

/// A connection removed from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_key: RoomKey,
    pub member: Member,
    /// Members still in the room after the removal.
    pub remaining: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Full membership of the joined room, ordered by join time.
    pub members: Vec<Member>,
    /// Set when the connection was moved out of another room.
    pub previous: Option<Departure>,
}

/// Membership bookkeeping for every live room.
///
/// A connection is a member of at most one room. Joining a second room moves
/// the connection; joining the same room again only replaces its display name.
/// Rooms exist only while they have members.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomKey, Vec<Member>>,
    memberships: HashMap<ConnectionId, RoomKey>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(
        &mut self,
        room_key: RoomKey,
        connection_id: ConnectionId,
        display_name: String,
    ) -> Result<JoinOutcome, DirectoryError> {
        if room_key.is_empty() {
            return Err(DirectoryError::EmptyRoomKey);
        }

        let mut previous = None;
        if let Some(current) = self.memberships.get(&connection_id) {
            if *current == room_key {
                let members = self.rooms.entry(room_key).or_default();
                if let Some(existing) = members
                    .iter_mut()
                    .find(|m| m.connection_id == connection_id)
                {
                    existing.display_name = display_name;
                }
                return Ok(JoinOutcome {
                    members: members.clone(),
                    previous: None,
                });
            }
            debug!("Connection {} moves from room {} to {}", connection_id, current, room_key);
            previous = self.leave(&connection_id);
        }

        let members = self.rooms.entry(room_key.clone()).or_default();
        members.push(Member {
            connection_id: connection_id.clone(),
            display_name,
        });
        let members = members.clone();
        self.memberships.insert(connection_id, room_key);

        Ok(JoinOutcome { members, previous })
    }

    /// Remove a connection from whichever room it is in. Unknown connections are a no-op.
    pub fn leave(&mut self, connection_id: &ConnectionId) -> Option<Departure> {
        let room_key = self.memberships.remove(connection_id)?;
        let members = self.rooms.get_mut(&room_key)?;

        let position = members
            .iter()
            .position(|m| &m.connection_id == connection_id)?;
        let member = members.remove(position);
        let remaining = members.clone();

        if remaining.is_empty() {
            self.rooms.remove(&room_key);
            debug!("Room {} is empty and was dropped", room_key);
        }

        Some(Departure {
            room_key,
            member,
            remaining,
        })
    }

    pub fn list_members(&self, room_key: &RoomKey) -> Vec<Member> {
        self.rooms.get(room_key).cloned().unwrap_or_default()
    }

    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<&RoomKey> {
        self.memberships.get(connection_id)
    }

    pub fn member(&self, connection_id: &ConnectionId) -> Option<&Member> {
        let room_key = self.memberships.get(connection_id)?;
        self.rooms
            .get(room_key)?
            .iter()
            .find(|m| &m.connection_id == connection_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn member_count(&self) -> usize {
        self.memberships.len()
    }
}

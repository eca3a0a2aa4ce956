use crate::models::{ConnectionId, Member};

/// A participant's local picture of who is in the room.
///
/// Snapshots replace the whole view, so applying the same or an older
/// announcement never produces duplicate entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MembershipView {
    members: Vec<Member>,
}

impl MembershipView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&mut self, members: Vec<Member>) {
        self.members = members;
    }

    /// Returns the removed member, if it was present.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Member> {
        let position = self
            .members
            .iter()
            .position(|m| &m.connection_id == connection_id)?;
        Some(self.members.remove(position))
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.iter().any(|m| &m.connection_id == connection_id)
    }

    /// Earliest-joined member other than `me`.
    pub fn sync_target(&self, me: &ConnectionId) -> Option<&ConnectionId> {
        self.members
            .iter()
            .map(|m| &m.connection_id)
            .find(|id| *id != me)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

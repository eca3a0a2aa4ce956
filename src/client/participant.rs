use tracing::{debug, info, warn};

use crate::client::content::{ContentChange, ContentHolder};
use crate::client::membership::MembershipView;
use crate::models::{
    ClientMessage, ConnectionId, ContentChangedEvent, ContentChangedMessage, JoinMessage,
    JoinedEvent, Member, RequestSyncMessage, RoomKey, ServerEvent, SyncContentMessage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Joining,
    Joined,
}

/// Things the presence UI of a participant may want to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// This participant is now in the room.
    Joined { members: Vec<Member> },
    PeerJoined {
        connection_id: ConnectionId,
        display_name: String,
    },
    PeerLeft {
        connection_id: ConnectionId,
        display_name: String,
    },
    /// Local content was replaced by a remote update.
    ContentReplaced { content: String },
    ServerError { message: String },
    TransportFailed { reason: String },
}

/// Outcome of handling one server event.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reaction {
    pub outbound: Vec<ClientMessage>,
    pub notices: Vec<Notice>,
}

/// Transport-free protocol adapter for one participant in one room.
///
/// Feed it server events and local content changes; it answers with the
/// messages to send and the notices to surface.
pub struct Participant<H: ContentHolder> {
    room_key: RoomKey,
    display_name: String,
    connection_id: Option<ConnectionId>,
    state: SessionState,
    members: MembershipView,
    holder: H,
    cache: Option<String>,
}

impl<H: ContentHolder> Participant<H> {
    /// Text already present in `holder` counts as observed content.
    pub fn new(room_key: RoomKey, display_name: impl Into<String>, holder: H) -> Self {
        let initial = holder.content();
        let cache = (!initial.is_empty()).then_some(initial);
        Self {
            room_key,
            display_name: display_name.into(),
            connection_id: None,
            state: SessionState::Disconnected,
            members: MembershipView::new(),
            holder,
            cache,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.connection_id.as_ref()
    }

    pub fn room_key(&self) -> &RoomKey {
        &self.room_key
    }

    pub fn members(&self) -> &[Member] {
        self.members.members()
    }

    /// Last content this participant has observed, if any.
    pub fn content(&self) -> Option<&str> {
        self.cache.as_deref()
    }

    pub fn holder(&self) -> &H {
        &self.holder
    }

    pub fn join(&mut self) -> ClientMessage {
        self.state = SessionState::Joining;
        ClientMessage::Join(JoinMessage {
            room_key: self.room_key.clone(),
            display_name: self.display_name.clone(),
        })
    }

    /// A user edit through the holder. Returns the broadcast to send, if joined.
    pub fn edit(&mut self, content: impl Into<String>) -> Option<ClientMessage> {
        let change = self.holder.edit(content.into());
        self.on_content_change(change)
    }

    /// Route a change reported by the content holder.
    pub fn on_content_change(&mut self, change: ContentChange) -> Option<ClientMessage> {
        match change {
            ContentChange::ProgrammaticSet(content) => {
                self.cache = Some(content);
                None
            }
            ContentChange::UserEdit(content) => {
                self.cache = Some(content.clone());
                if self.state != SessionState::Joined {
                    debug!("Edit kept local, not joined to {}", self.room_key);
                    return None;
                }
                Some(ClientMessage::ContentChanged(ContentChangedMessage {
                    room_key: self.room_key.clone(),
                    content,
                }))
            }
        }
    }

    pub fn handle_event(&mut self, event: ServerEvent) -> Reaction {
        let mut reaction = Reaction::default();
        match event {
            ServerEvent::Connected(connected) => {
                debug!("Assigned connection id {}", connected.connection_id);
                self.connection_id = Some(connected.connection_id);
            }
            ServerEvent::Joined(joined) => self.on_joined(joined, &mut reaction),
            ServerEvent::SyncRequested(request) => {
                if self.state != SessionState::Joined {
                    return reaction;
                }
                match &self.cache {
                    Some(content) => reaction.outbound.push(ClientMessage::SyncContent(
                        SyncContentMessage {
                            content: content.clone(),
                            target_connection_id: request.requester_connection_id,
                        },
                    )),
                    None => debug!(
                        "Nothing to sync to {}, no content observed yet",
                        request.requester_connection_id
                    ),
                }
            }
            ServerEvent::ContentChanged(changed) => self.on_remote_content(changed, &mut reaction),
            ServerEvent::Left(left) => {
                self.members.remove(&left.connection_id);
                info!("{} left room {}", left.display_name, self.room_key);
                reaction.notices.push(Notice::PeerLeft {
                    connection_id: left.connection_id,
                    display_name: left.display_name,
                });
            }
            ServerEvent::Error(error) => {
                warn!("Server reported an error: {}", error.message);
                if self.state == SessionState::Joining {
                    self.state = SessionState::Disconnected;
                }
                reaction.notices.push(Notice::ServerError {
                    message: error.message,
                });
            }
            ServerEvent::Pong(_) => {}
        }
        reaction
    }

    /// Leave deliberately; the server announces the departure on close.
    pub fn leave(&mut self) {
        self.state = SessionState::Disconnected;
        self.members.clear();
    }

    /// The transport is gone. Back to a pre-room state, no retry.
    pub fn transport_lost(&mut self, reason: impl Into<String>) -> Notice {
        self.state = SessionState::Disconnected;
        self.connection_id = None;
        self.members.clear();
        Notice::TransportFailed {
            reason: reason.into(),
        }
    }

    fn on_joined(&mut self, joined: JoinedEvent, reaction: &mut Reaction) {
        self.members.apply_snapshot(joined.members);

        let is_me = self.connection_id.as_ref() == Some(&joined.joined_connection_id);
        if !is_me {
            info!("{} joined room {}", joined.joined_display_name, self.room_key);
            reaction.notices.push(Notice::PeerJoined {
                connection_id: joined.joined_connection_id,
                display_name: joined.joined_display_name,
            });
            return;
        }

        let first_join = self.state != SessionState::Joined;
        self.state = SessionState::Joined;
        reaction.notices.push(Notice::Joined {
            members: self.members.members().to_vec(),
        });
        if !first_join {
            return;
        }

        // Ask exactly one existing member for the current content
        if let Some(target) = self.members.sync_target(&joined.joined_connection_id) {
            reaction.outbound.push(ClientMessage::RequestSync(RequestSyncMessage {
                target_connection_id: target.clone(),
            }));
        }
    }

    fn on_remote_content(&mut self, changed: ContentChangedEvent, reaction: &mut Reaction) {
        if changed.room_key != self.room_key {
            warn!("Ignoring content for foreign room {}", changed.room_key);
            return;
        }

        let change = self.holder.set_content(changed.content);
        let content = change.content().to_string();
        let echo = self.on_content_change(change);
        debug_assert!(echo.is_none(), "programmatic set must not broadcast");

        reaction.notices.push(Notice::ContentReplaced { content });
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::client::{ContentHolder, Participant, TextBuffer};
use crate::models::{ClientMessage, ConnectionId, Member, RoomKey, ServerEvent};
use crate::services::{EventReceiver, RoomSyncService};
use crate::websocket::handler::dispatch;

/// One simulated participant connection.
pub struct Peer {
    pub connection_id: ConnectionId,
    pub participant: Participant<TextBuffer>,
    /// Every event delivered to this peer, in order.
    pub received: Vec<ServerEvent>,
    /// Every message this peer sent, in order.
    pub sent: Vec<ClientMessage>,
    events: EventReceiver,
}

pub struct RoomHarness {
    pub service: Arc<RoomSyncService>,
    peers: BTreeMap<String, Peer>,
}

impl RoomHarness {
    pub fn new() -> Self {
        Self {
            service: Arc::new(RoomSyncService::new()),
            peers: BTreeMap::new(),
        }
    }

    /// Open a connection for `label`; nothing is sent until [`RoomHarness::join`].
    pub async fn connect(&mut self, label: &str, room_key: &str, holder: TextBuffer) {
        let (connection_id, events) = self.service.connect();
        let participant = Participant::new(RoomKey::from(room_key), label, holder);
        self.peers.insert(
            label.to_string(),
            Peer {
                connection_id,
                participant,
                received: Vec::new(),
                sent: Vec::new(),
                events,
            },
        );
        self.settle().await;
    }

    pub async fn join(&mut self, label: &str) {
        self.join_unsettled(label).await;
        self.settle().await;
    }

    /// Send the join without delivering any resulting events.
    pub async fn join_unsettled(&mut self, label: &str) {
        let msg = self.peer_mut(label).participant.join();
        self.send(label, msg).await;
    }

    /// Connect and join in one step.
    pub async fn enter(&mut self, label: &str, room_key: &str) {
        self.connect(label, room_key, TextBuffer::new()).await;
        self.join(label).await;
    }

    pub async fn edit(&mut self, label: &str, content: &str) {
        if let Some(msg) = self.peer_mut(label).participant.edit(content) {
            self.send(label, msg).await;
        }
        self.settle().await;
    }

    /// Send a raw client message on behalf of `label`.
    pub async fn send(&mut self, label: &str, msg: ClientMessage) {
        let peer = self.peer_mut(label);
        peer.sent.push(msg.clone());
        let connection_id = peer.connection_id.clone();
        dispatch(&self.service, &connection_id, msg).await;
    }

    /// Drop the transport of `label` and run the leave protocol.
    pub async fn disconnect(&mut self, label: &str) -> Peer {
        let peer = self
            .peers
            .remove(label)
            .unwrap_or_else(|| panic!("unknown peer {label}"));
        self.service.disconnect(&peer.connection_id).await;
        self.settle().await;
        peer
    }

    /// Deliver queued events until no peer has anything left to react to.
    pub async fn settle(&mut self) {
        loop {
            let mut pending = Vec::new();
            for (label, peer) in self.peers.iter_mut() {
                while let Ok(event) = peer.events.try_recv() {
                    peer.received.push(event.clone());
                    let reaction = peer.participant.handle_event(event);
                    for msg in reaction.outbound {
                        pending.push((label.clone(), msg));
                    }
                }
            }
            if pending.is_empty() {
                break;
            }
            for (label, msg) in pending {
                self.send(&label, msg).await;
            }
        }
    }

    pub fn peer(&self, label: &str) -> &Peer {
        self.peers
            .get(label)
            .unwrap_or_else(|| panic!("unknown peer {label}"))
    }

    fn peer_mut(&mut self, label: &str) -> &mut Peer {
        self.peers
            .get_mut(label)
            .unwrap_or_else(|| panic!("unknown peer {label}"))
    }

    pub fn id(&self, label: &str) -> ConnectionId {
        self.peer(label).connection_id.clone()
    }

    pub fn content(&self, label: &str) -> Option<String> {
        self.peer(label).participant.content().map(str::to_string)
    }

    pub fn editor_text(&self, label: &str) -> String {
        self.peer(label).participant.holder().content()
    }

    pub fn members(&self, label: &str) -> Vec<Member> {
        self.peer(label).participant.members().to_vec()
    }

    /// `contentChanged` events delivered to `label`.
    pub fn content_events(&self, label: &str) -> Vec<String> {
        self.peer(label)
            .received
            .iter()
            .filter_map(|event| match event {
                ServerEvent::ContentChanged(changed) => Some(changed.content.clone()),
                _ => None,
            })
            .collect()
    }

    /// `contentChanged` broadcasts sent by `label`.
    pub fn broadcasts_sent(&self, label: &str) -> usize {
        self.peer(label)
            .sent
            .iter()
            .filter(|msg| matches!(msg, ClientMessage::ContentChanged(_)))
            .count()
    }

    pub fn clear_history(&mut self) {
        for peer in self.peers.values_mut() {
            peer.received.clear();
            peer.sent.clear();
        }
    }
}

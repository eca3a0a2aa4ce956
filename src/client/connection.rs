use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::client::content::ContentHolder;
use crate::client::error::ClientError;
use crate::client::participant::{Notice, Participant, SessionState};
use crate::models::{ClientMessage, ConnectionId, Member, RoomKey, ServerEvent};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Observable state of a [`RoomClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub state: SessionState,
    pub connection_id: Option<ConnectionId>,
    pub members: Vec<Member>,
    pub content: Option<String>,
}

impl ClientSnapshot {
    fn of<H: ContentHolder>(participant: &Participant<H>) -> Self {
        Self {
            state: participant.state(),
            connection_id: participant.connection_id().cloned(),
            members: participant.members().to_vec(),
            content: participant.content().map(str::to_string),
        }
    }
}

enum Command {
    Edit(String),
    Leave,
}

/// A participant connected to the coordinator over WebSocket.
///
/// The connection is driven by a background task; edits are queued to it and
/// state is observed through [`RoomClient::snapshot`] and notices.
pub struct RoomClient {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<ClientSnapshot>,
    notices: mpsc::UnboundedReceiver<Notice>,
    task: JoinHandle<()>,
}

impl RoomClient {
    /// Connect to `url` and join `room_key`. Fails with
    /// [`ClientError::Transport`] when the coordinator cannot be reached.
    pub async fn connect<H: ContentHolder>(
        url: &str,
        room_key: RoomKey,
        display_name: impl Into<String>,
        holder: H,
    ) -> Result<Self, ClientError> {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        info!("Connected to {}", url);

        let participant = Participant::new(room_key, display_name, holder);
        let (snapshot_tx, snapshot) = watch::channel(ClientSnapshot::of(&participant));
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notices) = mpsc::unbounded_channel();

        let task = tokio::spawn(drive(participant, ws, command_rx, snapshot_tx, notice_tx));

        Ok(Self {
            commands,
            snapshot,
            notices,
            task,
        })
    }

    /// Queue a user edit for broadcast.
    pub fn edit(&self, content: impl Into<String>) -> Result<(), ClientError> {
        self.commands
            .send(Command::Edit(content.into()))
            .map_err(|_| ClientError::Closed)
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Wait until the client state satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&ClientSnapshot) -> bool,
    ) -> Result<ClientSnapshot, ClientError> {
        let snapshot = self
            .snapshot
            .wait_for(predicate)
            .await
            .map_err(|_| ClientError::Closed)?;
        Ok(snapshot.clone())
    }

    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Close the connection and wait for the driver to stop.
    pub async fn leave(self) -> Result<(), ClientError> {
        self.commands
            .send(Command::Leave)
            .map_err(|_| ClientError::Closed)?;
        self.task.await.map_err(|_| ClientError::Closed)
    }
}

async fn drive<H: ContentHolder>(
    mut participant: Participant<H>,
    ws: WsStream,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshot_tx: watch::Sender<ClientSnapshot>,
    notice_tx: mpsc::UnboundedSender<Notice>,
) {
    let (mut write, mut read) = ws.split();

    let join = participant.join();
    if let Err(e) = send(&mut write, &join).await {
        let _ = notice_tx.send(participant.transport_lost(e.to_string()));
        snapshot_tx.send_replace(ClientSnapshot::of(&participant));
        return;
    }
    snapshot_tx.send_replace(ClientSnapshot::of(&participant));

    loop {
        let outcome = tokio::select! {
            command = commands.recv() => on_command(&mut participant, &mut write, command).await,
            frame = read.next() => on_frame(&mut participant, &mut write, &notice_tx, frame).await,
        };
        if let Step::Stop(notice) = outcome {
            if let Some(notice) = notice {
                let _ = notice_tx.send(notice);
            }
            snapshot_tx.send_replace(ClientSnapshot::of(&participant));
            break;
        }
        snapshot_tx.send_replace(ClientSnapshot::of(&participant));
    }

    close(&mut write, &mut read).await;
}

enum Step {
    Continue,
    Stop(Option<Notice>),
}

async fn on_command<H: ContentHolder>(
    participant: &mut Participant<H>,
    write: &mut WsWrite,
    command: Option<Command>,
) -> Step {
    match command {
        Some(Command::Edit(content)) => {
            let Some(msg) = participant.edit(content) else {
                return Step::Continue;
            };
            match send(write, &msg).await {
                Ok(()) => Step::Continue,
                Err(e) => Step::Stop(Some(participant.transport_lost(e.to_string()))),
            }
        }
        Some(Command::Leave) | None => {
            debug!("Leaving room {}", participant.room_key());
            participant.leave();
            Step::Stop(None)
        }
    }
}

async fn on_frame<H: ContentHolder>(
    participant: &mut Participant<H>,
    write: &mut WsWrite,
    notice_tx: &mpsc::UnboundedSender<Notice>,
    frame: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
) -> Step {
    let text = match frame {
        Some(Ok(Message::Text(text))) => text,
        Some(Ok(Message::Close(_))) | None => {
            return Step::Stop(Some(participant.transport_lost("server closed the connection")));
        }
        Some(Ok(_)) => return Step::Continue,
        Some(Err(e)) => return Step::Stop(Some(participant.transport_lost(e.to_string()))),
    };

    let event: ServerEvent = match serde_json::from_str(text.as_str()) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring malformed server event: {}", e);
            return Step::Continue;
        }
    };

    let reaction = participant.handle_event(event);
    for notice in reaction.notices {
        let _ = notice_tx.send(notice);
    }
    for msg in &reaction.outbound {
        if let Err(e) = send(write, msg).await {
            return Step::Stop(Some(participant.transport_lost(e.to_string())));
        }
    }
    Step::Continue
}

async fn send(write: &mut WsWrite, msg: &ClientMessage) -> Result<(), ClientError> {
    let text = serde_json::to_string(msg)?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))
}

async fn close(write: &mut WsWrite, read: &mut WsRead) {
    if write.send(Message::Close(None)).await.is_err() {
        return;
    }
    // Drain until the server acknowledges the close
    let drain = async {
        while let Some(Ok(frame)) = read.next().await {
            if matches!(frame, Message::Close(_)) {
                break;
            }
        }
    };
    if tokio::time::timeout(CLOSE_TIMEOUT, drain).await.is_err() {
        debug!("Server did not acknowledge close within {:?}", CLOSE_TIMEOUT);
    }
}

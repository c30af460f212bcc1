use chrono::Local;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Fixed delay between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub enum ChatCommand {
    Send { body: String, message_id: String },
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    Connected,
    Disconnected,
    Message(ChatWireMessage),
    Error(String),
}

/// One JSON text frame on the chat socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatWireMessage {
    pub id: String,
    pub room: String,
    pub author: String,
    pub body: String,
    pub timestamp: String,
}

/// Owns the chat socket of one open chat view.
#[derive(Debug)]
pub struct ChatWorker {
    url: String,
    room: String,
    author: String,
    commands: mpsc::Receiver<ChatCommand>,
    events: mpsc::Sender<ChatEvent>,
    /// Commands accepted while disconnected, flushed after the next connect.
    pending: Vec<ChatCommand>,
}

enum Outcome {
    /// Socket dropped; reconnect.
    Lost,
    /// Command channel closed; the view is gone.
    Closed,
}

impl ChatWorker {
    pub fn new(
        url: impl Into<String>,
        room: impl Into<String>,
        author: impl Into<String>,
        commands: mpsc::Receiver<ChatCommand>,
        events: mpsc::Sender<ChatEvent>,
    ) -> Self {
        Self {
            url: url.into(),
            room: room.into(),
            author: author.into(),
            commands,
            events,
            pending: Vec::new(),
        }
    }

    pub async fn run(mut self) {
        loop {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    debug!("chat connected to {}", self.url);
                    self.emit(ChatEvent::Connected).await;
                    if let Outcome::Closed = self.serve(stream).await {
                        return;
                    }
                }
                Err(e) => {
                    self.emit(ChatEvent::Error(format!("chat connect failed: {e}"))).await;
                    self.emit(ChatEvent::Disconnected).await;
                }
            }

            loop {
                match self.commands.try_recv() {
                    Ok(cmd) => self.pending.push(cmd),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => return,
                }
            }
            sleep(RECONNECT_DELAY).await;
        }
    }

    async fn serve<S>(&mut self, stream: S) -> Outcome
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
            + Unpin,
    {
        let (mut write, mut read) = stream.split();

        for cmd in std::mem::take(&mut self.pending) {
            if let Err(e) = self.send_command(&mut write, cmd.clone()).await {
                self.pending.push(cmd);
                self.emit(ChatEvent::Error(format!("chat send failed: {e}"))).await;
            }
        }

        loop {
            tokio::select! {
                maybe_cmd = self.commands.recv() => {
                    let Some(cmd) = maybe_cmd else {
                        return Outcome::Closed;
                    };
                    if let Err(e) = self.send_command(&mut write, cmd.clone()).await {
                        self.pending.push(cmd);
                        self.emit(ChatEvent::Error(format!("chat send failed: {e}"))).await;
                        self.emit(ChatEvent::Disconnected).await;
                        return Outcome::Lost;
                    }
                }
                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match decode_inbound(text.as_str(), &self.room) {
                                Ok(Some(msg)) => self.emit(ChatEvent::Message(msg)).await,
                                Ok(None) => {}
                                Err(e) => self.emit(ChatEvent::Error(format!("chat parse error: {e}"))).await,
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            self.emit(ChatEvent::Disconnected).await;
                            return Outcome::Lost;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            self.emit(ChatEvent::Error(format!("chat read failed: {e}"))).await;
                            self.emit(ChatEvent::Disconnected).await;
                            return Outcome::Lost;
                        }
                    }
                }
            }
        }
    }

    async fn send_command<W>(&self, write: &mut W, cmd: ChatCommand) -> Result<(), String>
    where
        W: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let ChatCommand::Send { body, message_id } = cmd;
        let text = encode_outbound(&self.room, &self.author, message_id, body)?;
        write.send(Message::Text(text.into())).await.map_err(|e| e.to_string())
    }

    async fn emit(&self, event: ChatEvent) {
        if self.events.send(event).await.is_err() {
            warn!("chat event dropped: UI loop has stopped");
        }
    }
}

/// Parse an inbound frame. Frames addressed to other rooms yield `Ok(None)`.
fn decode_inbound(text: &str, room: &str) -> Result<Option<ChatWireMessage>, serde_json::Error> {
    let msg = serde_json::from_str::<ChatWireMessage>(text)?;
    Ok((msg.room == room).then_some(msg))
}

fn encode_outbound(room: &str, author: &str, message_id: String, body: String) -> Result<String, String> {
    let payload = ChatWireMessage {
        id: message_id,
        room: room.to_string(),
        author: author.to_string(),
        body,
        timestamp: Local::now().format("%H:%M").to_string(),
    };
    serde_json::to_string(&payload).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_for_other_room_is_ignored() {
        let frame = r#"{"id":"1","room":"finals","author":"a","body":"hi","timestamp":"10:00"}"#;
        assert!(decode_inbound(frame, "lobby").unwrap().is_none());
        let msg = decode_inbound(frame, "finals").unwrap().unwrap();
        assert_eq!(msg.body, "hi");
    }

    #[test]
    fn malformed_inbound_is_an_error() {
        assert!(decode_inbound("not json", "lobby").is_err());
    }

    #[test]
    fn outbound_frame_is_json_for_the_room() {
        let text = encode_outbound("lobby", "ref", "ref-1".into(), "kickoff moved".into()).unwrap();
        let decoded: ChatWireMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.room, "lobby");
        assert_eq!(decoded.author, "ref");
        assert_eq!(decoded.id, "ref-1");
        assert_eq!(decoded.body, "kickoff moved");
    }
}

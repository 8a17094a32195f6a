use crate::error::SignalingError;
use crate::signaling::SignalingChannel;
use std::sync::Arc;
use tandem_core::{ChatMessage, RoomId, SignalEvent};
use tracing::debug;

/// Room chat over the signaling relay.
///
/// Sent lines are echoed into the log locally since the relay does not
/// deliver a sender's own messages back to it.
pub struct ChatChannel {
    signaling: Arc<dyn SignalingChannel>,
    log: Vec<ChatMessage>,
}

impl ChatChannel {
    pub fn new(signaling: Arc<dyn SignalingChannel>) -> Self {
        Self {
            signaling,
            log: Vec::new(),
        }
    }

    /// Relay `text` to the room. Whitespace-only text is a no-op and yields
    /// `None`.
    pub async fn send(
        &mut self,
        room_id: &RoomId,
        username: &str,
        text: &str,
    ) -> Result<Option<ChatMessage>, SignalingError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        self.signaling
            .send(SignalEvent::ChatMessage {
                room_id: Some(room_id.clone()),
                username: username.to_owned(),
                message: text.to_owned(),
            })
            .await?;

        let message = ChatMessage::new(username, text);
        self.log.push(message.clone());
        debug!("Chat sent to {} ({} lines)", room_id, self.log.len());
        Ok(Some(message))
    }

    /// Record an inbound line.
    pub fn receive(&mut self, username: impl Into<String>, text: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::new(username, text);
        self.log.push(message.clone());
        message
    }

    /// Lines in arrival order, own lines included.
    pub fn log(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

use crate::error::SignalingError;
use async_trait::async_trait;
use tandem_core::{ParticipantId, RoomId, SignalEvent};
use tokio::sync::mpsc;

/// Room-scoped pub/sub relay used for connection setup and chat.
///
/// Implementations deliver events from one sender in send order; nothing is
/// promised about ordering across senders.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Identity the relay assigned to this client.
    fn local_id(&self) -> ParticipantId;

    /// Announce presence in `room_id`. Other members receive `user-joined`.
    async fn join(&self, room_id: &RoomId, username: &str) -> Result<(), SignalingError>;

    async fn send(&self, event: SignalEvent) -> Result<(), SignalingError>;

    /// Start receiving inbound events. A new subscription replaces the old one.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SignalEvent>;

    /// Stop delivering inbound events; the receiver then yields `None`.
    fn unsubscribe(&self);

    async fn leave(&self, room_id: &RoomId, username: &str) -> Result<(), SignalingError>;
}

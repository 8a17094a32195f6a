use crate::error::SignalingError;
use crate::signaling::SignalingChannel;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tandem_core::{ParticipantId, RoomId, SignalEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// An event as received by the relay, tagged with its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedEvent {
    pub from: ParticipantId,
    pub event: SignalEvent,
}

#[derive(Default)]
struct Member {
    room: Option<RoomId>,
    tx: Option<mpsc::UnboundedSender<SignalEvent>>,
}

#[derive(Default)]
struct RelayInner {
    members: DashMap<ParticipantId, Member>,
    history: Mutex<Vec<RelayedEvent>>,
}

/// In-process signaling bus keyed by room id.
///
/// Mirrors the behaviour of the hosted relay: joins are announced to the
/// rest of the room, `signal` is routed to its `to` with `from` stamped, chat
/// is broadcast to everyone but the sender.
#[derive(Clone, Default)]
pub struct LocalRelay {
    inner: Arc<RelayInner>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client and assign its id.
    pub fn connect(&self) -> RelayClient {
        let id = ParticipantId::new();
        self.inner.members.insert(id.clone(), Member::default());
        debug!("Relay client {} connected", id);
        RelayClient {
            id,
            relay: self.clone(),
        }
    }

    /// Forcefully drop a client, as if its connection to the relay died.
    pub fn disconnect(&self, id: &ParticipantId) {
        if self.inner.members.remove(id).is_some() {
            info!("Relay dropped client {}", id);
        }
    }

    pub fn members_of(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        self.inner
            .members
            .iter()
            .filter(|entry| entry.value().room.as_ref() == Some(room_id))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Every event the relay accepted, in arrival order.
    pub fn history(&self) -> Vec<RelayedEvent> {
        self.inner
            .history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    fn record(&self, from: &ParticipantId, event: &SignalEvent) {
        if let Ok(mut history) = self.inner.history.lock() {
            history.push(RelayedEvent {
                from: from.clone(),
                event: event.clone(),
            });
        }
    }

    fn room_of(&self, id: &ParticipantId) -> Result<Option<RoomId>, SignalingError> {
        self.inner
            .members
            .get(id)
            .map(|m| m.room.clone())
            .ok_or(SignalingError::Disconnected)
    }

    fn deliver(&self, to: &ParticipantId, event: SignalEvent) {
        let tx = self.inner.members.get(to).and_then(|m| m.tx.clone());
        match tx {
            Some(tx) => {
                if tx.send(event).is_err() {
                    warn!("Receiver of {} is gone", to);
                }
            }
            None => warn!("Attempted to relay to unsubscribed member {}", to),
        }
    }

    fn broadcast(&self, room_id: &RoomId, except: &ParticipantId, event: SignalEvent) {
        // Collect first so no map guard is held while sending.
        let targets: Vec<_> = self
            .inner
            .members
            .iter()
            .filter(|entry| entry.key() != except && entry.value().room.as_ref() == Some(room_id))
            .filter_map(|entry| entry.value().tx.clone())
            .collect();

        for tx in targets {
            let _ = tx.send(event.clone());
        }
    }
}

/// One client's connection to a `LocalRelay`.
pub struct RelayClient {
    id: ParticipantId,
    relay: LocalRelay,
}

#[async_trait]
impl SignalingChannel for RelayClient {
    fn local_id(&self) -> ParticipantId {
        self.id.clone()
    }

    async fn join(&self, room_id: &RoomId, username: &str) -> Result<(), SignalingError> {
        {
            let mut member = self
                .relay
                .inner
                .members
                .get_mut(&self.id)
                .ok_or(SignalingError::Disconnected)?;
            member.room = Some(room_id.clone());
        }

        self.relay.record(
            &self.id,
            &SignalEvent::JoinRoom {
                room_id: room_id.clone(),
                username: username.to_owned(),
            },
        );
        info!("{} ({}) joined room {}", username, self.id, room_id);

        self.relay.broadcast(
            room_id,
            &self.id,
            SignalEvent::UserJoined {
                id: self.id.clone(),
            },
        );
        Ok(())
    }

    async fn send(&self, event: SignalEvent) -> Result<(), SignalingError> {
        let room = self.relay.room_of(&self.id)?;

        match event {
            SignalEvent::JoinRoom { room_id, username } => self.join(&room_id, &username).await,
            SignalEvent::LeaveRoom { room_id, username } => self.leave(&room_id, &username).await,
            SignalEvent::Signal { to, data, .. } => {
                let Some(room) = room else {
                    return Err(SignalingError::NotJoined);
                };
                if self.relay.room_of(&to).ok().flatten().as_ref() != Some(&room) {
                    warn!("Dropping signal from {} to {}: not in room {}", self.id, to, room);
                    return Ok(());
                }
                let event = SignalEvent::Signal {
                    to: to.clone(),
                    from: Some(self.id.clone()),
                    data,
                };
                self.relay.record(&self.id, &event);
                self.relay.deliver(&to, event);
                Ok(())
            }
            SignalEvent::ChatMessage {
                username, message, ..
            } => {
                let Some(room) = room else {
                    return Err(SignalingError::NotJoined);
                };
                let event = SignalEvent::ChatMessage {
                    room_id: Some(room.clone()),
                    username,
                    message,
                };
                self.relay.record(&self.id, &event);
                self.relay.broadcast(&room, &self.id, event);
                Ok(())
            }
            SignalEvent::UserJoined { .. } => Err(SignalingError::Send(
                "user-joined is emitted by the relay only".to_owned(),
            )),
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SignalEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(mut member) = self.relay.inner.members.get_mut(&self.id) {
            member.tx = Some(tx);
        }
        rx
    }

    fn unsubscribe(&self) {
        if let Some(mut member) = self.relay.inner.members.get_mut(&self.id) {
            member.tx = None;
        }
    }

    async fn leave(&self, room_id: &RoomId, username: &str) -> Result<(), SignalingError> {
        {
            let mut member = self
                .relay
                .inner
                .members
                .get_mut(&self.id)
                .ok_or(SignalingError::Disconnected)?;
            if member.room.as_ref() != Some(room_id) {
                return Ok(());
            }
            member.room = None;
        }

        self.relay.record(
            &self.id,
            &SignalEvent::LeaveRoom {
                room_id: room_id.clone(),
                username: username.to_owned(),
            },
        );
        info!("{} ({}) left room {}", username, self.id, room_id);
        Ok(())
    }
}

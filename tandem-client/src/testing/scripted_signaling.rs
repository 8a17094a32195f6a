use crate::error::SignalingError;
use crate::signaling::SignalingChannel;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tandem_core::{
    IceCandidate, ParticipantId, RoomId, SessionDescription, SignalData, SignalEvent,
};
use tokio::sync::mpsc;

#[derive(Default)]
struct Script {
    sent: Vec<SignalEvent>,
    inbound: Option<mpsc::UnboundedSender<SignalEvent>>,
    room: Option<RoomId>,
    disconnected: bool,
}

/// Signaling endpoint whose remote side is played by the test.
///
/// Outbound events are recorded; inbound events are whatever the test
/// `inject`s.
pub struct ScriptedSignaling {
    id: ParticipantId,
    script: Mutex<Script>,
}

impl ScriptedSignaling {
    pub fn new(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(Script::default()),
        }
    }

    /// Deliver `event` to the subscriber. Returns `false` if nobody listens.
    pub fn inject(&self, event: SignalEvent) -> bool {
        match &self.lock().inbound {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver a `signal` from `from`, as the relay would stamp it.
    pub fn inject_signal(&self, from: impl Into<ParticipantId>, data: SignalData) -> bool {
        self.inject(SignalEvent::Signal {
            to: self.id.clone(),
            from: Some(from.into()),
            data,
        })
    }

    /// Simulate the relay connection dropping.
    pub fn disconnect(&self) {
        let mut script = self.lock();
        script.inbound = None;
        script.disconnected = true;
    }

    pub fn joined_room(&self) -> Option<RoomId> {
        self.lock().room.clone()
    }

    pub fn sent(&self) -> Vec<SignalEvent> {
        self.lock().sent.clone()
    }

    /// Descriptions sent so far, with their recipients.
    pub fn sent_descriptions(&self) -> Vec<(ParticipantId, SessionDescription)> {
        self.sent_signals()
            .into_iter()
            .filter_map(|(to, data)| data.sdp.map(|sdp| (to, sdp)))
            .collect()
    }

    pub fn sent_candidates(&self) -> Vec<(ParticipantId, IceCandidate)> {
        self.sent_signals()
            .into_iter()
            .filter_map(|(to, data)| data.candidate.map(|c| (to, c)))
            .collect()
    }

    fn sent_signals(&self) -> Vec<(ParticipantId, SignalData)> {
        self.lock()
            .sent
            .iter()
            .filter_map(|event| match event {
                SignalEvent::Signal { to, data, .. } => Some((to.clone(), data.clone())),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SignalingChannel for ScriptedSignaling {
    fn local_id(&self) -> ParticipantId {
        self.id.clone()
    }

    async fn join(&self, room_id: &RoomId, username: &str) -> Result<(), SignalingError> {
        let mut script = self.lock();
        if script.disconnected {
            return Err(SignalingError::Disconnected);
        }
        script.room = Some(room_id.clone());
        script.sent.push(SignalEvent::JoinRoom {
            room_id: room_id.clone(),
            username: username.to_owned(),
        });
        Ok(())
    }

    async fn send(&self, event: SignalEvent) -> Result<(), SignalingError> {
        let mut script = self.lock();
        if script.disconnected {
            return Err(SignalingError::Disconnected);
        }
        if script.room.is_none() {
            return Err(SignalingError::NotJoined);
        }
        script.sent.push(event);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SignalEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().inbound = Some(tx);
        rx
    }

    fn unsubscribe(&self) {
        self.lock().inbound = None;
    }

    async fn leave(&self, room_id: &RoomId, username: &str) -> Result<(), SignalingError> {
        let mut script = self.lock();
        if script.room.as_ref() != Some(room_id) {
            return Ok(());
        }
        script.room = None;
        script.sent.push(SignalEvent::LeaveRoom {
            room_id: room_id.clone(),
            username: username.to_owned(),
        });
        Ok(())
    }
}

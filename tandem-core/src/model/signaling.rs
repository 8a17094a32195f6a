use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// One half of an offer/answer exchange, shaped like the browser's
/// `RTCSessionDescriptionInit` so both ends can share the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn is_offer(&self) -> bool {
        self.sdp_type == SdpType::Offer
    }
}

/// Connectivity candidate in `RTCIceCandidateInit` JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// Body of a `signal` event. Exactly one field is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<SessionDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<IceCandidate>,
}

impl SignalData {
    pub fn description(desc: SessionDescription) -> Self {
        Self {
            sdp: Some(desc),
            candidate: None,
        }
    }

    pub fn candidate(candidate: IceCandidate) -> Self {
        Self {
            sdp: None,
            candidate: Some(candidate),
        }
    }
}

/// Room-scoped events carried by the signaling relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum SignalEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId, username: String },

    UserJoined { id: ParticipantId },

    /// `from` is stamped by the relay; senders leave it empty.
    Signal {
        to: ParticipantId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ParticipantId>,
        data: SignalData,
    },

    #[serde(rename_all = "camelCase")]
    ChatMessage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        username: String,
        message: String,
    },

    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId, username: String },
}

impl SignalEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            SignalEvent::JoinRoom { .. } => "join-room",
            SignalEvent::UserJoined { .. } => "user-joined",
            SignalEvent::Signal { .. } => "signal",
            SignalEvent::ChatMessage { .. } => "chat-message",
            SignalEvent::LeaveRoom { .. } => "leave-room",
        }
    }
}

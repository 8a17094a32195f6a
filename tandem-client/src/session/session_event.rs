use crate::error::{ConnectivityCandidateError, NegotiationError};
use crate::peer::LinkState;
use crate::transport::RemoteTrackInfo;
use serde::Serialize;
use tandem_core::{ChatMessage, ParticipantId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Joining,
    Active,
    Left,
}

/// Notifications broadcast to every subscriber of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PeerLinkCreated {
        remote: ParticipantId,
        outbound: bool,
    },

    /// First remote media arrived on the link.
    PeerConnected { remote: ParticipantId },

    RemoteTrack {
        remote: ParticipantId,
        track: RemoteTrackInfo,
    },

    ChatReceived(ChatMessage),

    /// The link was discarded; chat keeps working.
    NegotiationFailed(NegotiationError),

    CandidateFailed(ConnectivityCandidateError),

    SignalingLost,

    Left,
}

/// Point-in-time view of the session, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub lifecycle: Lifecycle,
    pub local_id: ParticipantId,
    pub room_id: RoomId,
    pub remote: Option<ParticipantId>,
    pub link_state: Option<LinkState>,
    pub has_remote_description: bool,
    /// An offer/answer exchange is running; `link_state` is the state it
    /// started from.
    pub negotiating: bool,
    /// Remote candidates not yet applied, held by the link or the session.
    pub pending_candidates: usize,
    pub selected_camera: Option<usize>,
    pub chat_len: usize,
}

use crate::media::MediaKind;
use std::fmt;
use tandem_core::{IceCandidate, ParticipantId};

/// Identity of one peer connection instance. A fresh sequence number per
/// connection lets the session drop events from a discarded one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkId {
    pub remote: ParticipantId,
    pub seq: u64,
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.remote, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrackInfo {
    pub track_id: String,
    pub stream_id: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Callbacks from the connection object, funneled into the session loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    CandidateGenerated(LinkId, IceCandidate),
    RemoteTrack(LinkId, RemoteTrackInfo),
    StateChanged(LinkId, Connectivity),
}

impl TransportEvent {
    pub fn link(&self) -> &LinkId {
        match self {
            TransportEvent::CandidateGenerated(link, _)
            | TransportEvent::RemoteTrack(link, _)
            | TransportEvent::StateChanged(link, _) => link,
        }
    }
}

use tandem_core::ParticipantId;
use thiserror::Error;

/// Failures acquiring or enumerating capture devices.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("camera/microphone access denied: {0}")]
    MediaAccess(String),

    #[error("device enumeration failed: {0}")]
    DeviceEnumeration(String),

    #[error("no camera at index {index} ({available} available)")]
    InvalidDevice { index: usize, available: usize },

    #[error("failed to substitute outbound tracks: {0}")]
    TrackSubstitution(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalingError {
    #[error("signaling channel disconnected")]
    Disconnected,

    #[error("client has not joined a room")]
    NotJoined,

    #[error("signaling send failed: {0}")]
    Send(String),
}

/// A description step was malformed, rejected or stalled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("failed to open peer connection to {peer}: {reason}")]
    Transport { peer: ParticipantId, reason: String },

    #[error("{step} failed for {peer}: {reason}")]
    Description {
        peer: ParticipantId,
        step: &'static str,
        reason: String,
    },

    #[error("{step} timed out for {peer}")]
    Timeout {
        peer: ParticipantId,
        step: &'static str,
    },

    #[error("negotiation with {0} cancelled")]
    Cancelled(ParticipantId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("candidate from {peer} rejected: {reason}")]
pub struct ConnectivityCandidateError {
    pub peer: ParticipantId,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("room session has ended")]
    SessionClosed,
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;

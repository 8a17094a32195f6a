mod chat;
mod participant;
mod room;
mod signaling;

pub use chat::ChatMessage;
pub use participant::{Participant, ParticipantId};
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SdpType, SessionDescription, SignalData, SignalEvent};

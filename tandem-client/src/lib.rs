//! Two-party room sessions: one peer connection per room membership,
//! negotiated over a pluggable signaling relay, with in-place camera
//! switching and room chat.

pub mod chat;
pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod testing;
pub mod transport;

pub use config::{GlarePolicy, SessionConfig};
pub use error::{
    ConnectivityCandidateError, MediaError, NegotiationError, Result, SessionError,
    SignalingError,
};
pub use session::{Lifecycle, RoomSession, SessionEvent, SessionHandle, SessionSnapshot};

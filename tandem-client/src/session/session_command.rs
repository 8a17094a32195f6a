use crate::error::SessionError;
use crate::media::{DeviceDescriptor, MediaKind};
use crate::session::SessionSnapshot;
use tandem_core::ChatMessage;
use tokio::sync::oneshot;

type Reply<T> = oneshot::Sender<T>;

/// Requests from a `SessionHandle` to the session loop.
#[derive(Debug)]
pub enum SessionCommand {
    SwitchCamera {
        index: usize,
        reply: Reply<Result<DeviceDescriptor, SessionError>>,
    },

    ListCameras {
        reply: Reply<Result<Vec<DeviceDescriptor>, SessionError>>,
    },

    SendChat {
        text: String,
        reply: Reply<Result<Option<ChatMessage>, SessionError>>,
    },

    ChatLog {
        reply: Reply<Vec<ChatMessage>>,
    },

    /// Mute or camera-off without releasing the device.
    SetTrackEnabled {
        kind: MediaKind,
        enabled: bool,
        reply: Reply<bool>,
    },

    Snapshot {
        reply: Reply<SessionSnapshot>,
    },

    Leave {
        reply: Reply<()>,
    },
}

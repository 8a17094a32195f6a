use crate::error::{Result, SessionError};
use crate::media::{DeviceDescriptor, MediaKind};
use crate::session::{Lifecycle, SessionCommand, SessionEvent, SessionSnapshot};
use std::sync::Arc;
use tandem_core::{ChatMessage, ParticipantId, RoomId};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Cloneable front end of a running `RoomSession`.
#[derive(Clone)]
pub struct SessionHandle {
    local_id: ParticipantId,
    room_id: RoomId,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
    lifecycle: watch::Receiver<Lifecycle>,
    leave_requested: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    pub(crate) fn new(
        local_id: ParticipantId,
        room_id: RoomId,
        commands: mpsc::Sender<SessionCommand>,
        events: broadcast::Sender<SessionEvent>,
        lifecycle: watch::Receiver<Lifecycle>,
        leave_requested: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            local_id,
            room_id,
            commands,
            events,
            lifecycle,
            leave_requested,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Subscribe to session events from now on.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    /// Resolves once the session has left the room, for whatever reason.
    pub async fn left(&self) {
        let mut lifecycle = self.lifecycle.clone();
        let _ = lifecycle.wait_for(|l| *l == Lifecycle::Left).await;
    }

    /// Move capture to the camera at `index`. An established call keeps
    /// running; only the outbound tracks change.
    pub async fn switch_camera(&self, index: usize) -> Result<DeviceDescriptor> {
        self.request(|reply| SessionCommand::SwitchCamera { index, reply })
            .await?
    }

    pub async fn list_cameras(&self) -> Result<Vec<DeviceDescriptor>> {
        self.request(|reply| SessionCommand::ListCameras { reply })
            .await?
    }

    /// Returns `None` when `text` is blank and nothing was sent.
    pub async fn send_chat(&self, text: impl Into<String>) -> Result<Option<ChatMessage>> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendChat { text, reply })
            .await?
    }

    pub async fn chat_log(&self) -> Result<Vec<ChatMessage>> {
        self.request(|reply| SessionCommand::ChatLog { reply }).await
    }

    pub async fn set_audio_enabled(&self, enabled: bool) -> Result<bool> {
        self.set_track_enabled(MediaKind::Audio, enabled).await
    }

    pub async fn set_video_enabled(&self, enabled: bool) -> Result<bool> {
        self.set_track_enabled(MediaKind::Video, enabled).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Leave the room. In-flight negotiation is abandoned. Calling this on a
    /// session that already left is a no-op.
    pub async fn leave(&self) -> Result<()> {
        self.leave_requested.send_replace(true);

        match self.request(|reply| SessionCommand::Leave { reply }).await {
            Ok(()) | Err(SessionError::SessionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn set_track_enabled(&self, kind: MediaKind, enabled: bool) -> Result<bool> {
        self.request(|reply| SessionCommand::SetTrackEnabled {
            kind,
            enabled,
            reply,
        })
        .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        response.await.map_err(|_| SessionError::SessionClosed)
    }
}

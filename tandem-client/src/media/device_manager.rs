use crate::error::MediaError;
use crate::media::{CaptureBackend, DeviceDescriptor, LocalStream, MediaKind};
use crate::peer::PeerLink;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Local capture state. `active` is owned here and only lent to the peer link.
#[derive(Debug, Default)]
pub struct LocalMediaState {
    pub active: Option<LocalStream>,
    pub devices: Vec<DeviceDescriptor>,
    pub selected: Option<usize>,
}

/// Owns the single live capture stream of a room membership.
///
/// Every operation takes the state lock for its whole duration, so a camera
/// switch in flight finishes (or fails) before the next one starts.
pub struct MediaDeviceManager {
    backend: Arc<dyn CaptureBackend>,
    state: Mutex<LocalMediaState>,
}

impl MediaDeviceManager {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(LocalMediaState::default()),
        }
    }

    pub async fn list_cameras(&self) -> Result<Vec<DeviceDescriptor>, MediaError> {
        let devices = self.backend.enumerate_video_inputs().await?;
        self.state.lock().await.devices = devices.clone();
        Ok(devices)
    }

    /// Acquire a stream and make it the active one, stopping the previous.
    pub async fn start(&self, device_id: Option<&str>) -> Result<LocalStream, MediaError> {
        let mut state = self.state.lock().await;

        let stream = self.backend.open(device_id).await?;
        if let Some(previous) = state.active.replace(stream.clone()) {
            previous.stop();
        }
        state.selected = stream
            .device_id()
            .and_then(|id| state.devices.iter().position(|d| d.device_id == id));

        info!("Local stream {} active", stream.id());
        Ok(stream)
    }

    /// Move capture to the camera at `index` and substitute the outbound
    /// tracks on `link` in place. No renegotiation takes place.
    ///
    /// The previous stream is stopped before the new one is acquired; on
    /// failure no stream is left active.
    pub async fn switch_to(
        &self,
        index: usize,
        link: Option<&PeerLink>,
    ) -> Result<DeviceDescriptor, MediaError> {
        let mut state = self.state.lock().await;

        if state.devices.is_empty() {
            state.devices = self.backend.enumerate_video_inputs().await?;
        }
        let device = state
            .devices
            .get(index)
            .cloned()
            .ok_or(MediaError::InvalidDevice {
                index,
                available: state.devices.len(),
            })?;

        // Carry mute/camera-off over to the new tracks.
        let (audio_enabled, video_enabled) = match &state.active {
            Some(s) => (s.audio().is_enabled(), s.video().is_enabled()),
            None => (true, true),
        };

        if let Some(previous) = state.active.take() {
            previous.stop();
        }
        state.selected = None;

        let stream = self.backend.open(Some(&device.device_id)).await?;
        stream.audio().set_enabled(audio_enabled);
        stream.video().set_enabled(video_enabled);
        state.active = Some(stream.clone());
        state.selected = Some(index);

        match link {
            Some(link) => {
                link.substitute_tracks(&stream).await?;
                info!(
                    "Switched to {} and substituted tracks toward {}",
                    device.label,
                    link.remote()
                );
            }
            None => info!("Switched to {}; no peer link yet", device.label),
        }

        Ok(device)
    }

    pub async fn set_enabled(&self, kind: MediaKind, enabled: bool) -> bool {
        let state = self.state.lock().await;
        match &state.active {
            Some(stream) => {
                stream.track(kind).set_enabled(enabled);
                true
            }
            None => {
                warn!("No active stream to toggle {:?}", kind);
                false
            }
        }
    }

    /// Stream lent to the next negotiation.
    pub async fn active_stream(&self) -> Option<LocalStream> {
        self.state.lock().await.active.clone()
    }

    pub async fn selected_index(&self) -> Option<usize> {
        self.state.lock().await.selected
    }

    /// Stop every local track. Safe to call repeatedly.
    pub async fn stop_all(&self) {
        let mut state = self.state.lock().await;
        if let Some(stream) = state.active.take() {
            stream.stop();
            info!("Local stream {} stopped", stream.id());
        }
        state.selected = None;
    }
}

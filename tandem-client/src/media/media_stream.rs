use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// One captured track. Clones share the same underlying source, so stopping
/// any clone stops them all.
#[derive(Clone)]
pub struct LocalTrack {
    id: String,
    kind: MediaKind,
    rtp: Arc<TrackLocalStaticSample>,
    live: Arc<AtomicBool>,
    enabled: Arc<AtomicBool>,
}

impl LocalTrack {
    pub fn new(kind: MediaKind, rtp: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            id: rtp.id().to_owned(),
            kind,
            rtp,
            live: Arc::new(AtomicBool::new(true)),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Sample sink handed to the peer connection's sender.
    pub fn rtp(&self) -> Arc<TrackLocalStaticSample> {
        Arc::clone(&self.rtp)
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Muted/camera-off tracks stay live but stop producing samples.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!("Stopped {:?} track {}", self.kind, self.id);
        }
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("live", &self.is_live())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Exactly one audio and one video track captured together.
#[derive(Debug, Clone)]
pub struct LocalStream {
    id: String,
    device_id: Option<String>,
    audio: LocalTrack,
    video: LocalTrack,
}

impl LocalStream {
    pub fn new(
        id: impl Into<String>,
        device_id: Option<String>,
        audio: LocalTrack,
        video: LocalTrack,
    ) -> Self {
        Self {
            id: id.into(),
            device_id,
            audio,
            video,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn audio(&self) -> &LocalTrack {
        &self.audio
    }

    pub fn video(&self) -> &LocalTrack {
        &self.video
    }

    pub fn track(&self, kind: MediaKind) -> &LocalTrack {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }

    pub fn tracks(&self) -> [&LocalTrack; 2] {
        [&self.audio, &self.video]
    }

    pub fn is_live(&self) -> bool {
        self.audio.is_live() || self.video.is_live()
    }

    pub fn stop(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }
}

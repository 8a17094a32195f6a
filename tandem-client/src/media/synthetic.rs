//! Virtual capture devices.
//!
//! Produces deterministic sample payloads on a timer so sessions can run
//! end to end on machines without cameras (CI, demos, tests).

use crate::error::MediaError;
use crate::media::{CaptureBackend, DeviceDescriptor, LocalStream, LocalTrack, MediaKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const VIDEO_FRAME_INTERVAL: Duration = Duration::from_millis(33);
const AUDIO_FRAME_INTERVAL: Duration = Duration::from_millis(20);
const VIDEO_FRAME_LEN: usize = 1200;
const AUDIO_FRAME_LEN: usize = 160;

pub struct SyntheticCapture {
    cameras: Vec<DeviceDescriptor>,
    deny_access: AtomicBool,
    deny_enumeration: AtomicBool,
    opened: AtomicUsize,
    /// Streams not yet seen stopped. Pruned on every `open`.
    streams: Mutex<Vec<LocalStream>>,
}

impl SyntheticCapture {
    /// `count` virtual cameras named `synthetic-0`, `synthetic-1`, ...
    pub fn new(count: usize) -> Self {
        let cameras = (0..count)
            .map(|i| DeviceDescriptor::new(format!("synthetic-{i}"), format!("Synthetic Camera {i}")))
            .collect();
        Self::with_cameras(cameras)
    }

    pub fn with_cameras(cameras: Vec<DeviceDescriptor>) -> Self {
        Self {
            cameras,
            deny_access: AtomicBool::new(false),
            deny_enumeration: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the user refusing the camera/microphone prompt.
    pub fn set_deny_access(&self, deny: bool) {
        self.deny_access.store(deny, Ordering::SeqCst);
    }

    pub fn set_deny_enumeration(&self, deny: bool) {
        self.deny_enumeration.store(deny, Ordering::SeqCst);
    }

    /// Number of streams acquired so far.
    pub fn opened_streams(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn last_opened(&self) -> Option<LocalStream> {
        self.streams.lock().ok().and_then(|streams| streams.last().cloned())
    }

    /// Streams handed out that have not been stopped yet.
    pub fn live_streams(&self) -> usize {
        self.streams
            .lock()
            .map(|streams| streams.iter().filter(|s| s.is_live()).count())
            .unwrap_or(0)
    }
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        Self::new(2)
    }
}

#[async_trait]
impl CaptureBackend for SyntheticCapture {
    async fn enumerate_video_inputs(&self) -> Result<Vec<DeviceDescriptor>, MediaError> {
        if self.deny_enumeration.load(Ordering::SeqCst) {
            return Err(MediaError::DeviceEnumeration(
                "enumeration not permitted".to_owned(),
            ));
        }
        Ok(self.cameras.clone())
    }

    async fn open(&self, device_id: Option<&str>) -> Result<LocalStream, MediaError> {
        if self.deny_access.load(Ordering::SeqCst) {
            return Err(MediaError::MediaAccess("permission denied".to_owned()));
        }

        let device = match device_id {
            Some(id) => self
                .cameras
                .iter()
                .find(|c| c.device_id == id)
                .ok_or_else(|| MediaError::MediaAccess(format!("device {id} unavailable")))?,
            None => self
                .cameras
                .first()
                .ok_or_else(|| MediaError::MediaAccess("no video input available".to_owned()))?,
        };

        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let stream_id = format!("synthetic-stream-{n}");

        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90_000,
                ..Default::default()
            },
            format!("video-{}-{n}", device.device_id),
            stream_id.clone(),
        ));
        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            format!("audio-{n}"),
            stream_id.clone(),
        ));

        let stream = LocalStream::new(
            stream_id,
            Some(device.device_id.clone()),
            LocalTrack::new(MediaKind::Audio, audio),
            LocalTrack::new(MediaKind::Video, video),
        );

        if let Ok(mut streams) = self.streams.lock() {
            streams.retain(LocalStream::is_live);
            streams.push(stream.clone());
        }
        spawn_feeder(stream.video().clone(), VIDEO_FRAME_INTERVAL, VIDEO_FRAME_LEN);
        spawn_feeder(stream.audio().clone(), AUDIO_FRAME_INTERVAL, AUDIO_FRAME_LEN);

        info!("Opened synthetic stream {} on {}", stream.id(), device.label);
        Ok(stream)
    }
}

fn spawn_feeder(track: LocalTrack, interval: Duration, frame_len: usize) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut frame_number: u64 = 0;

        while track.is_live() {
            ticker.tick().await;
            if !track.is_enabled() {
                continue;
            }

            let sample = Sample {
                data: synthetic_payload(frame_number, frame_len),
                duration: interval,
                ..Default::default()
            };
            if let Err(e) = track.rtp().write_sample(&sample).await {
                debug!("Synthetic write on {} failed: {}", track.id(), e);
            }
            frame_number += 1;
        }

        debug!("Synthetic feeder for {} stopped", track.id());
    });
}

/// Payload that changes every frame.
pub fn synthetic_payload(frame_number: u64, len: usize) -> Bytes {
    let base = (frame_number % 256) as u8;
    let data: Vec<u8> = (0..len).map(|i| base.wrapping_add((i % 256) as u8)).collect();
    Bytes::from(data)
}

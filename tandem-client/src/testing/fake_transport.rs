use crate::media::{LocalStream, MediaKind};
use crate::transport::{
    Connectivity, LinkId, PeerTransport, RemoteTrackInfo, TransportConfig, TransportEvent,
    TransportFactory,
};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tandem_core::{IceCandidate, ParticipantId, SdpType, SessionDescription};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Counters across every fake connection on the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub opened: usize,
    pub closed: usize,
    pub offers: usize,
    pub answers: usize,
    pub replacements: usize,
    /// Candidates handed to a connection with no remote description.
    pub premature_candidates: usize,
}

#[derive(Default)]
struct NetworkState {
    stats: NetworkStats,
    applied: HashMap<ParticipantId, Vec<String>>,
    received_video: HashMap<ParticipantId, String>,
    live: HashMap<ParticipantId, usize>,
    max_live: HashMap<ParticipantId, usize>,
    stalled: HashSet<ParticipantId>,
}

/// Shared bookkeeping for a set of `FakeTransport`s.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory for connections owned by `owner`.
    pub fn factory(&self, owner: ParticipantId) -> FakeTransportFactory {
        FakeTransportFactory {
            owner,
            network: self.clone(),
        }
    }

    pub fn stats(&self) -> NetworkStats {
        self.lock().stats.clone()
    }

    /// Candidate strings `owner` applied, in order.
    pub fn applied_candidates(&self, owner: &ParticipantId) -> Vec<String> {
        self.lock().applied.get(owner).cloned().unwrap_or_default()
    }

    /// Id of the video track `receiver` is currently getting.
    pub fn received_video(&self, receiver: &ParticipantId) -> Option<String> {
        self.lock().received_video.get(receiver).cloned()
    }

    pub fn live_links(&self, owner: &ParticipantId) -> usize {
        self.lock().live.get(owner).copied().unwrap_or(0)
    }

    /// Highest number of simultaneously open connections `owner` ever had.
    pub fn max_live_links(&self, owner: &ParticipantId) -> usize {
        self.lock().max_live.get(owner).copied().unwrap_or(0)
    }

    /// Make `owner`'s remote description steps hang until cancelled.
    pub fn stall_descriptions(&self, owner: &ParticipantId, stall: bool) {
        let mut state = self.lock();
        if stall {
            state.stalled.insert(owner.clone());
        } else {
            state.stalled.remove(owner);
        }
    }

    /// A description as a fake connection owned by `owner` would produce it.
    pub fn description_for(
        owner: &ParticipantId,
        sdp_type: SdpType,
        audio: &str,
        video: &str,
    ) -> SessionDescription {
        let sdp = render_sdp(
            owner,
            &[
                (MediaKind::Audio, audio.to_owned()),
                (MediaKind::Video, video.to_owned()),
            ],
        );
        SessionDescription { sdp_type, sdp }
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        // A panicking test thread must not hide the counters from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone)]
pub struct FakeTransportFactory {
    owner: ParticipantId,
    network: FakeNetwork,
}

#[async_trait]
impl TransportFactory for FakeTransportFactory {
    async fn open(
        &self,
        link: LinkId,
        _config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        {
            let mut state = self.network.lock();
            state.stats.opened += 1;
            let live = state.live.entry(self.owner.clone()).or_default();
            *live += 1;
            let live = *live;
            let max = state.max_live.entry(self.owner.clone()).or_default();
            *max = (*max).max(live);
        }
        debug!("Fake connection {} opened by {}", link, self.owner);

        Ok(Arc::new(FakeTransport {
            owner: self.owner.clone(),
            link,
            network: self.network.clone(),
            events,
            inner: Mutex::new(FakeConnection::default()),
        }))
    }
}

#[derive(Default)]
struct FakeConnection {
    tracks: Vec<(MediaKind, String)>,
    remote: Option<SessionDescription>,
    gathered: u32,
    closed: bool,
}

/// Loopback connection: descriptions list track ids, candidates are plain
/// strings, and remote tracks appear as soon as a remote description lands.
pub struct FakeTransport {
    owner: ParticipantId,
    link: LinkId,
    network: FakeNetwork,
    events: mpsc::Sender<TransportEvent>,
    inner: Mutex<FakeConnection>,
}

impl FakeTransport {
    fn conn(&self) -> MutexGuard<'_, FakeConnection> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.try_send(event).is_err() {
            warn!("Dropped fake transport event on {}", self.link);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.conn().closed {
            bail!("connection {} is closed", self.link);
        }
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn attach_stream(&self, stream: &LocalStream) -> Result<()> {
        self.ensure_open()?;
        self.conn().tracks = stream
            .tracks()
            .iter()
            .map(|t| (t.kind(), t.id().to_owned()))
            .collect();
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.ensure_open()?;
        let sdp = render_sdp(&self.owner, &self.conn().tracks);
        self.network.lock().stats.offers += 1;
        Ok(SessionDescription::offer(sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.ensure_open()?;
        let sdp = {
            let conn = self.conn();
            match &conn.remote {
                Some(remote) if remote.is_offer() => render_sdp(&self.owner, &conn.tracks),
                _ => bail!("cannot answer without a remote offer"),
            }
        };
        self.network.lock().stats.answers += 1;
        Ok(SessionDescription::answer(sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.ensure_open()?;
        let n = {
            let mut conn = self.conn();
            if !desc.is_offer() && conn.remote.is_none() {
                bail!("local answer without a remote offer");
            }
            conn.gathered += 1;
            conn.gathered
        };

        // Gathering starts once the local description is in place.
        let candidate = IceCandidate {
            candidate: format!(
                "candidate:{}-{}-{} 1 udp 2122260223 127.0.0.1 {} typ host",
                self.owner,
                self.link.seq,
                n,
                50_000 + n
            ),
            sdp_mid: Some("0".to_owned()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        };
        self.emit(TransportEvent::CandidateGenerated(self.link.clone(), candidate));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.ensure_open()?;
        let stalled = self.network.lock().stalled.contains(&self.owner);
        if stalled {
            std::future::pending::<()>().await;
        }

        let tracks = parse_sdp(&desc.sdp)?;
        self.conn().remote = Some(desc);

        self.emit(TransportEvent::StateChanged(
            self.link.clone(),
            Connectivity::Connecting,
        ));
        for (kind, id) in tracks {
            if kind == MediaKind::Video {
                self.network
                    .lock()
                    .received_video
                    .insert(self.owner.clone(), id.clone());
            }
            self.emit(TransportEvent::RemoteTrack(
                self.link.clone(),
                RemoteTrackInfo {
                    track_id: id,
                    stream_id: format!("{}-stream", self.link.remote),
                    kind,
                },
            ));
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.ensure_open()?;
        if self.conn().remote.is_none() {
            self.network.lock().stats.premature_candidates += 1;
            bail!("remote description not set");
        }
        if candidate.candidate.contains("bogus") {
            bail!("unparseable candidate {}", candidate.candidate);
        }

        self.network
            .lock()
            .applied
            .entry(self.owner.clone())
            .or_default()
            .push(candidate.candidate);
        Ok(())
    }

    async fn replace_stream(&self, stream: &LocalStream) -> Result<()> {
        self.ensure_open()?;
        let video = stream.video().id().to_owned();
        self.conn().tracks = stream
            .tracks()
            .iter()
            .map(|t| (t.kind(), t.id().to_owned()))
            .collect();

        let mut state = self.network.lock();
        state.stats.replacements += 1;
        if let Some(received) = state.received_video.get_mut(&self.link.remote) {
            *received = video;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        {
            let mut conn = self.conn();
            if conn.closed {
                return Ok(());
            }
            conn.closed = true;
        }

        let mut state = self.network.lock();
        state.stats.closed += 1;
        if let Some(live) = state.live.get_mut(&self.owner) {
            *live = live.saturating_sub(1);
        }
        Ok(())
    }
}

fn render_sdp(owner: &ParticipantId, tracks: &[(MediaKind, String)]) -> String {
    let mut sdp = format!("v=0\r\no=- {owner} 0 IN IP4 127.0.0.1\r\ns=-\r\n");
    for (kind, id) in tracks {
        let kind = match kind {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        };
        sdp.push_str(&format!("a=track:{kind}:{id}\r\n"));
    }
    sdp
}

fn parse_sdp(sdp: &str) -> Result<Vec<(MediaKind, String)>> {
    if !sdp.starts_with("v=0") {
        return Err(anyhow!("malformed session description"));
    }

    sdp.lines()
        .filter_map(|line| line.strip_prefix("a=track:"))
        .map(|rest| -> Result<(MediaKind, String)> {
            let (kind, id) = rest
                .split_once(':')
                .ok_or_else(|| anyhow!("malformed track line {rest}"))?;
            let kind = match kind {
                "audio" => MediaKind::Audio,
                "video" => MediaKind::Video,
                other => bail!("unknown media kind {other}"),
            };
            Ok((kind, id.trim().to_owned()))
        })
        .collect()
}

use crate::media::{LocalStream, MediaKind};
use crate::transport::{
    Connectivity, LinkId, PeerTransport, RemoteTrackInfo, TransportConfig, TransportEvent,
    TransportFactory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, SdpType, SessionDescription};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// `PeerTransport` backed by a webrtc-rs peer connection.
pub struct RtcTransport {
    link: LinkId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<Vec<(MediaKind, Arc<RTCRtpSender>)>>,
}

impl RtcTransport {
    /// Build the connection and wire its callbacks into `event_tx`.
    pub async fn new(
        link: LinkId,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.rtc_ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = event_tx.clone();
        let state_link = link.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let link = state_link.clone();

                Box::pin(async move {
                    info!("Peer connection {} state: {:?}", link, s);
                    let connectivity = match s {
                        RTCPeerConnectionState::Connecting => Connectivity::Connecting,
                        RTCPeerConnectionState::Connected => Connectivity::Connected,
                        RTCPeerConnectionState::Disconnected => Connectivity::Disconnected,
                        RTCPeerConnectionState::Failed => Connectivity::Failed,
                        RTCPeerConnectionState::Closed => Connectivity::Closed,
                        _ => return,
                    };
                    let _ = tx.send(TransportEvent::StateChanged(link, connectivity)).await;
                })
            },
        ));

        // Trickle ICE: every local candidate goes out as soon as it is found.
        let ice_tx = event_tx.clone();
        let ice_link = link.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let link = ice_link.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(link, candidate))
                    .await;
            })
        }));

        let track_tx = event_tx.clone();
        let track_link = link.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let link = track_link.clone();

                Box::pin(async move {
                    let info = RemoteTrackInfo {
                        track_id: track.id(),
                        stream_id: track.stream_id(),
                        kind: match track.kind() {
                            RTPCodecType::Audio => MediaKind::Audio,
                            _ => MediaKind::Video,
                        },
                    };
                    debug!("Remote {:?} track {} on {}", info.kind, info.track_id, link);

                    // Keep the receive buffer drained until the track ends.
                    tokio::spawn(async move { while track.read_rtp().await.is_ok() {} });

                    let _ = tx.send(TransportEvent::RemoteTrack(link, info)).await;
                })
            },
        ));

        Ok(Self {
            link,
            peer_connection,
            senders: Mutex::new(Vec::new()),
        })
    }

    fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
        let rtc = match desc.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        Ok(rtc)
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn attach_stream(&self, stream: &LocalStream) -> Result<()> {
        let mut senders = self.senders.lock().await;

        for track in stream.tracks() {
            let sender = self
                .peer_connection
                .add_track(track.rtp() as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .with_context(|| format!("Failed to add track {}", track.id()))?;

            // RTCP has to be read for interceptors to work.
            let rtcp_sender = Arc::clone(&sender);
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while rtcp_sender.read(&mut rtcp_buf).await.is_ok() {}
            });

            senders.push((track.kind(), sender));
        }

        debug!("Attached stream {} to {}", stream.id(), self.link);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(Self::to_rtc(desc)?)
            .await
            .context("Failed to set local description")?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(Self::to_rtc(desc)?)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn replace_stream(&self, stream: &LocalStream) -> Result<()> {
        let senders = self.senders.lock().await;

        for (kind, sender) in senders.iter() {
            let track = stream.track(*kind);
            sender
                .replace_track(Some(track.rtp() as Arc<dyn TrackLocal + Send + Sync>))
                .await
                .with_context(|| format!("Failed to replace {:?} track", kind))?;
        }

        debug!("Replaced outbound tracks on {} with {}", self.link, stream.id());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Opens one `RtcTransport` per link.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcTransportFactory;

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn open(
        &self,
        link: LinkId,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let transport = RtcTransport::new(link, config, events).await?;
        Ok(Arc::new(transport))
    }
}

use std::sync::Arc;
use tandem_client::media::{CaptureBackend, SyntheticCapture};
use tandem_client::transport::{
    LinkId, RtcTransportFactory, TransportConfig, TransportEvent, TransportFactory,
};
use tandem_core::ParticipantId;
use tokio::sync::mpsc;

use crate::integration::init_tracing;

/// The webrtc-backed transport produces a real offer for attached tracks.
#[tokio::test]
async fn test_rtc_transport_offer() {
    init_tracing();

    let (tx, _rx) = mpsc::channel::<TransportEvent>(64);
    let link = LinkId {
        remote: ParticipantId::from("remote"),
        seq: 1,
    };
    let transport = RtcTransportFactory
        .open(link, &TransportConfig::host_only(), tx)
        .await
        .expect("Failed to open transport");

    let capture = Arc::new(SyntheticCapture::new(1));
    let stream = capture.open(None).await.unwrap();
    transport.attach_stream(&stream).await.unwrap();

    let offer = transport.create_offer().await.unwrap();
    assert!(offer.is_offer());
    assert!(offer.sdp.starts_with("v=0"));
    assert!(offer.sdp.contains("m=audio"));
    assert!(offer.sdp.contains("m=video"));

    // Replacing tracks works without touching the description.
    let next = capture.open(None).await.unwrap();
    transport.replace_stream(&next).await.unwrap();

    transport.close().await.unwrap();
    stream.stop();
    next.stop();
}

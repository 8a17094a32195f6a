use std::time::Duration;
use tandem_client::testing::FakeNetwork;
use tandem_client::{GlarePolicy, Lifecycle, SessionEvent};
use tandem_core::{IceCandidate, ParticipantId, SdpType, SignalData};

use crate::integration::init_tracing;
use crate::utils::{drain_events, scripted_party_with};

/// Leaving while a description step hangs returns promptly and late
/// signaling is ignored.
#[tokio::test]
async fn test_leave_during_negotiation() {
    init_tracing();

    let mut party =
        scripted_party_with("b", GlarePolicy::LowerIdAnswers, Duration::from_secs(30))
            .await
            .unwrap();
    party
        .network
        .stall_descriptions(&ParticipantId::from("b"), true);

    let offer = FakeNetwork::description_for(&"a".into(), SdpType::Offer, "aa", "av");
    party
        .signaling
        .inject_signal("a", SignalData::description(offer));
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(2), party.handle.leave())
        .await
        .expect("leave hung on the stalled step")
        .unwrap();

    assert_eq!(party.handle.lifecycle(), Lifecycle::Left);
    assert_eq!(party.network.live_links(&ParticipantId::from("b")), 0);
    assert!(party.signaling.joined_room().is_none());

    // Late arrivals after leaving go nowhere.
    assert!(!party.signaling.inject_signal(
        "a",
        SignalData::candidate(IceCandidate::new("candidate:late"))
    ));

    let events = drain_events(&mut party.events);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::NegotiationFailed(_)))
    );
    assert!(events.contains(&SessionEvent::Left));
}

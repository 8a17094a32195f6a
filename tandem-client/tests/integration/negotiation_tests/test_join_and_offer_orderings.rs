use tandem_client::peer::LinkState;
use tandem_client::testing::FakeNetwork;
use tandem_client::{GlarePolicy, SessionEvent};
use tandem_core::{ParticipantId, SdpType, SignalData, SignalEvent};

use crate::integration::init_tracing;
use crate::utils::{drain_events, scripted_party, wait_link_state};

fn remote_offer() -> SignalData {
    SignalData::description(FakeNetwork::description_for(
        &ParticipantId::from("a"),
        SdpType::Offer,
        "a-audio",
        "a-video",
    ))
}

fn remote_answer() -> SignalData {
    SignalData::description(FakeNetwork::description_for(
        &ParticipantId::from("a"),
        SdpType::Answer,
        "a-audio",
        "a-video",
    ))
}

fn links_created(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::PeerLinkCreated { .. }))
        .count()
}

#[tokio::test]
async fn test_offer_then_user_joined() {
    init_tracing();

    let mut party = scripted_party("b", GlarePolicy::LowerIdAnswers)
        .await
        .unwrap();

    assert!(party.signaling.inject_signal("a", remote_offer()));
    assert!(party.signaling.inject(SignalEvent::UserJoined {
        id: ParticipantId::from("a")
    }));

    wait_link_state(&party.handle, LinkState::Connected)
        .await
        .unwrap();
    // Let the late announcement be processed too.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(links_created(&drain_events(&mut party.events)), 1);
    assert_eq!(party.network.stats().opened, 1);
    assert_eq!(party.network.stats().offers, 0);
    let sent = party.signaling.sent_descriptions();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].1.is_offer());
}

#[tokio::test]
async fn test_user_joined_then_offer() {
    init_tracing();

    let mut party = scripted_party("b", GlarePolicy::LowerIdAnswers)
        .await
        .unwrap();

    assert!(party.signaling.inject(SignalEvent::UserJoined {
        id: ParticipantId::from("a")
    }));
    wait_link_state(&party.handle, LinkState::OfferSent)
        .await
        .unwrap();

    // "b" sorts after "a", so the crossing offer is ignored and ours stands.
    assert!(party.signaling.inject_signal("a", remote_offer()));
    assert!(party.signaling.inject_signal("a", remote_answer()));

    wait_link_state(&party.handle, LinkState::Connected)
        .await
        .unwrap();

    assert_eq!(links_created(&drain_events(&mut party.events)), 1);
    assert_eq!(party.network.stats().opened, 1);
    assert_eq!(party.network.stats().closed, 0);
    let sent = party.signaling.sent_descriptions();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.is_offer());
}

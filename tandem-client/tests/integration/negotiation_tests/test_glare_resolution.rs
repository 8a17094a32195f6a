use tandem_client::peer::LinkState;
use tandem_client::testing::FakeNetwork;
use tandem_client::{GlarePolicy, SessionEvent};
use tandem_core::{ParticipantId, SdpType, SignalData, SignalEvent};

use crate::integration::init_tracing;
use crate::utils::{drain_events, eventually, scripted_party, wait_link_state};

fn offer_from_b() -> SignalData {
    SignalData::description(FakeNetwork::description_for(
        &ParticipantId::from("b"),
        SdpType::Offer,
        "b-audio",
        "b-video",
    ))
}

#[tokio::test]
async fn test_lower_id_yields_and_answers() {
    init_tracing();

    let mut party = scripted_party("a", GlarePolicy::LowerIdAnswers)
        .await
        .unwrap();
    party.signaling.inject(SignalEvent::UserJoined {
        id: ParticipantId::from("b"),
    });
    wait_link_state(&party.handle, LinkState::OfferSent)
        .await
        .unwrap();

    party.signaling.inject_signal("b", offer_from_b());
    wait_link_state(&party.handle, LinkState::Connected)
        .await
        .unwrap();

    let events = drain_events(&mut party.events);
    let created: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PeerLinkCreated { outbound, .. } => Some(*outbound),
            _ => None,
        })
        .collect();
    assert_eq!(created, vec![true, false]);

    // The abandoned outbound link is released; only one stays open.
    assert_eq!(party.network.stats().closed, 1);
    assert_eq!(party.network.live_links(&ParticipantId::from("a")), 1);

    let sent = party.signaling.sent_descriptions();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].1.is_offer());
    assert!(!sent[1].1.is_offer());

    // Only the answering link's candidates go out; the dropped offer's never do.
    let signaling = &party.signaling;
    eventually("answer candidates sent", || async move {
        !signaling.sent_candidates().is_empty()
    })
    .await
    .unwrap();
    assert!(
        party
            .signaling
            .sent_candidates()
            .iter()
            .all(|(_, c)| c.candidate.starts_with("candidate:a-2-"))
    );
}

#[tokio::test]
async fn test_ignore_incoming_keeps_own_offer() {
    init_tracing();

    let party = scripted_party("a", GlarePolicy::IgnoreIncoming)
        .await
        .unwrap();
    party.signaling.inject(SignalEvent::UserJoined {
        id: ParticipantId::from("b"),
    });
    wait_link_state(&party.handle, LinkState::OfferSent)
        .await
        .unwrap();

    party.signaling.inject_signal("b", offer_from_b());
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let snapshot = party.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state, Some(LinkState::OfferSent));
    assert!(!snapshot.has_remote_description);
    assert_eq!(party.network.stats().opened, 1);
    assert_eq!(party.signaling.sent_descriptions().len(), 1);
}

use tandem_client::GlarePolicy;
use tandem_client::peer::LinkState;
use tandem_client::testing::FakeNetwork;
use tandem_core::{IceCandidate, ParticipantId, SdpType, SignalData};

use crate::integration::init_tracing;
use crate::utils::{eventually, scripted_party, wait_link_state};

/// Candidates racing ahead of the offer are held, then applied once and in
/// order after the offer lands.
#[tokio::test]
async fn test_early_candidates_buffered() {
    init_tracing();

    let party = scripted_party("b", GlarePolicy::LowerIdAnswers)
        .await
        .unwrap();
    let local = ParticipantId::from("b");

    for c in ["candidate:a-1", "candidate:a-2"] {
        party
            .signaling
            .inject_signal("a", SignalData::candidate(IceCandidate::new(c)));
    }
    let handle = &party.handle;
    eventually("two held candidates", || async move {
        handle
            .snapshot()
            .await
            .is_ok_and(|s| s.pending_candidates == 2 && s.link_state.is_none())
    })
    .await
    .unwrap();
    assert!(party.network.applied_candidates(&local).is_empty());

    let offer = FakeNetwork::description_for(&"a".into(), SdpType::Offer, "aa", "av");
    party
        .signaling
        .inject_signal("a", SignalData::description(offer));
    party.signaling.inject_signal(
        "a",
        SignalData::candidate(IceCandidate::new("candidate:a-3")),
    );

    wait_link_state(&party.handle, LinkState::Connected)
        .await
        .unwrap();
    let network = &party.network;
    let local = &local;
    eventually("third candidate applied", || async move {
        network.applied_candidates(local).len() == 3
    })
    .await
    .unwrap();

    assert_eq!(
        party.network.applied_candidates(local),
        vec!["candidate:a-1", "candidate:a-2", "candidate:a-3"]
    );
    assert_eq!(party.network.stats().premature_candidates, 0);
    assert_eq!(party.handle.snapshot().await.unwrap().pending_candidates, 0);
}

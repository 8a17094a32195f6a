use std::time::Duration;
use tandem_client::testing::FakeNetwork;
use tandem_client::{GlarePolicy, SessionEvent};
use tandem_core::{ChatMessage, IceCandidate, ParticipantId, SdpType, SignalData, SignalEvent};
use tokio::time::timeout;

use crate::integration::init_tracing;
use crate::utils::{eventually, scripted_party_with, wait_for_event};

/// Upper bound for a command while the handshake hangs, far below the
/// negotiation timeout.
const RESPONSIVE_MS: u64 = 500;

#[tokio::test]
async fn test_chat_during_stalled_negotiation() {
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

    let handle = &party.handle;
    eventually("negotiation in flight", || async move {
        handle.snapshot().await.is_ok_and(|s| s.negotiating)
    })
    .await
    .unwrap();

    let responsive = Duration::from_millis(RESPONSIVE_MS);
    let sent = timeout(responsive, party.handle.send_chat("hi"))
        .await
        .expect("send_chat blocked behind negotiation")
        .unwrap();
    assert_eq!(sent, Some(ChatMessage::new("b", "hi")));
    assert!(
        party
            .signaling
            .sent()
            .iter()
            .any(|e| matches!(e, SignalEvent::ChatMessage { message, .. } if message == "hi"))
    );

    party.signaling.inject(SignalEvent::ChatMessage {
        room_id: None,
        username: "ana".into(),
        message: "still there?".into(),
    });
    let received = timeout(
        responsive,
        wait_for_event(&mut party.events, |e| {
            matches!(e, SessionEvent::ChatReceived(_))
        }),
    )
    .await
    .expect("inbound chat blocked behind negotiation")
    .unwrap();
    assert_eq!(
        received,
        SessionEvent::ChatReceived(ChatMessage::new("ana", "still there?"))
    );
    assert_eq!(
        party.handle.chat_log().await.unwrap(),
        vec![
            ChatMessage::new("b", "hi"),
            ChatMessage::new("ana", "still there?")
        ]
    );

    // Candidates for the hanging link wait for it instead of going stale.
    party.signaling.inject_signal(
        "a",
        SignalData::candidate(IceCandidate::new("candidate:a-1")),
    );
    let handle = &party.handle;
    eventually("candidate held for the link", || async move {
        handle
            .snapshot()
            .await
            .is_ok_and(|s| s.negotiating && s.pending_candidates == 1)
    })
    .await
    .unwrap();
    assert!(
        party
            .network
            .applied_candidates(&ParticipantId::from("b"))
            .is_empty()
    );

    let snapshot = party.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.remote, Some(ParticipantId::from("a")));
    assert!(!snapshot.has_remote_description);
    assert_eq!(party.handle.list_cameras().await.unwrap().len(), 2);
}

use tandem_client::{GlarePolicy, Lifecycle, NegotiationError, SessionEvent};
use tandem_core::{SessionDescription, SignalData, SignalEvent};

use crate::integration::init_tracing;
use crate::utils::{scripted_party, wait_for_event};

/// A rejected description discards the link but leaves chat usable.
#[tokio::test]
async fn test_malformed_offer() {
    init_tracing();

    let mut party = scripted_party("b", GlarePolicy::LowerIdAnswers)
        .await
        .unwrap();

    party.signaling.inject_signal(
        "a",
        SignalData::description(SessionDescription::offer("not a session description")),
    );

    let failed = wait_for_event(&mut party.events, |e| {
        matches!(e, SessionEvent::NegotiationFailed(_))
    })
    .await
    .unwrap();
    assert!(matches!(
        failed,
        SessionEvent::NegotiationFailed(NegotiationError::Description { .. })
    ));

    let snapshot = party.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.lifecycle, Lifecycle::Active);
    assert_eq!(snapshot.link_state, None);
    assert_eq!(party.network.stats().closed, 1);

    let sent = party.handle.send_chat("still here").await.unwrap();
    assert!(sent.is_some());
    assert!(party.signaling.sent().iter().any(|e| matches!(
        e,
        SignalEvent::ChatMessage { message, .. } if message == "still here"
    )));

    party.signaling.inject(SignalEvent::ChatMessage {
        room_id: None,
        username: "ana".into(),
        message: "hi".into(),
    });
    wait_for_event(&mut party.events, |e| {
        matches!(e, SessionEvent::ChatReceived(_))
    })
    .await
    .unwrap();
    assert_eq!(party.handle.chat_log().await.unwrap().len(), 2);
}

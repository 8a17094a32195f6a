use tandem_client::SessionEvent;
use tandem_core::ChatMessage;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_event};

#[tokio::test]
async fn test_chat_between_parties() {
    init_tracing();

    let room = TestRoom::new("r1");
    let a = room.join("ana").await.unwrap();
    let mut b = room.join("ben").await.unwrap();

    // Chat does not wait for media negotiation.
    let sent = a.handle.send_chat("hello").await.unwrap();
    assert_eq!(sent, Some(ChatMessage::new("ana", "hello")));

    let received = wait_for_event(&mut b.events, |e| {
        matches!(e, SessionEvent::ChatReceived(_))
    })
    .await
    .unwrap();
    assert_eq!(
        received,
        SessionEvent::ChatReceived(ChatMessage::new("ana", "hello"))
    );

    b.handle.send_chat("hey ana").await.unwrap();

    assert_eq!(
        b.handle.chat_log().await.unwrap(),
        vec![
            ChatMessage::new("ana", "hello"),
            ChatMessage::new("ben", "hey ana")
        ]
    );
    // The sender's own line is echoed locally, not relayed back.
    assert_eq!(a.handle.chat_log().await.unwrap()[0], ChatMessage::new("ana", "hello"));
}

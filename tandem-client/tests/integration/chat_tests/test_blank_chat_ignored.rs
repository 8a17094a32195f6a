use tandem_core::SignalEvent;

use crate::integration::init_tracing;
use crate::utils::TestRoom;

#[tokio::test]
async fn test_blank_chat_ignored() {
    init_tracing();

    let room = TestRoom::new("r1");
    let a = room.join("ana").await.unwrap();

    assert_eq!(a.handle.send_chat("").await.unwrap(), None);
    assert_eq!(a.handle.send_chat("   \n\t").await.unwrap(), None);

    assert!(a.handle.chat_log().await.unwrap().is_empty());
    assert!(
        !room
            .relay
            .history()
            .iter()
            .any(|r| matches!(r.event, SignalEvent::ChatMessage { .. }))
    );
}

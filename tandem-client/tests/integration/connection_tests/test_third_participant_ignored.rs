use tandem_client::peer::LinkState;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_link_state};

#[tokio::test]
async fn test_third_participant_ignored() {
    init_tracing();

    let room = TestRoom::new("r1");
    let (a, b) = room.connect_pair().await.expect("pair did not connect");

    let c = room.join("cai").await.expect("third join failed");
    assert_eq!(room.relay.members_of(&room.room_id).len(), 3);

    // Give the announcement time to reach both sessions.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    wait_link_state(&a.handle, LinkState::Connected).await.unwrap();
    assert_eq!(a.handle.snapshot().await.unwrap().remote, Some(b.id()));
    assert_eq!(b.handle.snapshot().await.unwrap().remote, Some(a.id()));
    assert_eq!(room.network.max_live_links(&a.id()), 1);
    assert_eq!(room.network.max_live_links(&b.id()), 1);
    assert_eq!(c.handle.snapshot().await.unwrap().link_state, None);
}

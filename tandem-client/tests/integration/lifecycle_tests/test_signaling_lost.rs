use std::time::Duration;
use tandem_client::{Lifecycle, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_event};

/// Losing the relay ends the membership and releases everything.
#[tokio::test]
async fn test_signaling_lost() {
    init_tracing();

    let room = TestRoom::new("r1");
    let (mut a, _b) = room.connect_pair().await.expect("pair did not connect");

    room.relay.disconnect(&a.id());

    wait_for_event(&mut a.events, |e| *e == SessionEvent::SignalingLost)
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), a.handle.left())
        .await
        .expect("session did not end");

    assert_eq!(a.handle.lifecycle(), Lifecycle::Left);
    assert_eq!(a.capture.live_streams(), 0);
    assert_eq!(room.network.live_links(&a.id()), 0);
    // Leaving again after the fact is harmless.
    a.handle.leave().await.unwrap();
}

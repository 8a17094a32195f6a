use tandem_client::peer::LinkState;
use tandem_client::Lifecycle;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, eventually};

#[tokio::test]
async fn test_two_parties_connect() {
    init_tracing();

    let room = TestRoom::new("r1");
    let (a, b) = room.connect_pair().await.expect("pair did not connect");

    let snap_a = a.handle.snapshot().await.unwrap();
    let snap_b = b.handle.snapshot().await.unwrap();

    assert_eq!(snap_a.lifecycle, Lifecycle::Active);
    assert_eq!(snap_a.remote, Some(b.id()));
    assert_eq!(snap_b.remote, Some(a.id()));
    assert_eq!(snap_a.link_state, Some(LinkState::Connected));
    assert_eq!(snap_b.link_state, Some(LinkState::Connected));
    assert!(snap_a.has_remote_description);
    assert_eq!(snap_a.pending_candidates, 0);

    // One offer from the first participant, one answer back.
    assert_eq!(room.description_signals(), 2);
    let stats = room.network.stats();
    assert_eq!(stats.offers, 1);
    assert_eq!(stats.answers, 1);
    assert_eq!(room.network.max_live_links(&a.id()), 1);
    assert_eq!(room.network.max_live_links(&b.id()), 1);

    // Each side applies the candidate the other gathered.
    let network = &room.network;
    let b_id = &b.id();
    let from_a = &format!("candidate:{}", a.id());
    eventually("B applies A's candidate", || async move {
        network
            .applied_candidates(b_id)
            .iter()
            .any(|c| c.starts_with(from_a.as_str()))
    })
    .await
    .unwrap();
    assert_eq!(room.network.stats().premature_candidates, 0);
}

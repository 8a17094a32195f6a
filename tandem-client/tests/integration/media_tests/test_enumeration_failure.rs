use std::sync::Arc;
use tandem_client::media::SyntheticCapture;
use tandem_client::{Lifecycle, MediaError, SessionError};

use crate::integration::init_tracing;
use crate::utils::TestRoom;

/// Without device enumeration the call goes on; only switching is lost.
#[tokio::test]
async fn test_enumeration_failure() {
    init_tracing();

    let room = TestRoom::new("r1");
    let capture = Arc::new(SyntheticCapture::new(2));
    capture.set_deny_enumeration(true);

    let a = room.join_with("ana", capture.clone()).await.unwrap();
    let b = room.join("ben").await.unwrap();
    a.wait_connected().await.unwrap();
    b.wait_connected().await.unwrap();

    let err = a.handle.switch_camera(1).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Media(MediaError::DeviceEnumeration(_))
    ));
    assert!(a.handle.list_cameras().await.is_err());

    assert_eq!(a.handle.lifecycle(), Lifecycle::Active);
    assert_eq!(capture.live_streams(), 1);
    assert!(a.handle.send_chat("still talking").await.unwrap().is_some());
}

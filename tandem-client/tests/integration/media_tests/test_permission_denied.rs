use std::sync::Arc;
use tandem_client::media::SyntheticCapture;
use tandem_client::{MediaError, SessionError};

use crate::integration::init_tracing;
use crate::utils::TestRoom;

/// Refused camera access ends the attempt before presence is announced.
#[tokio::test]
async fn test_permission_denied() {
    init_tracing();

    let room = TestRoom::new("r1");
    let capture = Arc::new(SyntheticCapture::new(1));
    capture.set_deny_access(true);

    let err = room
        .join_with("ana", capture.clone())
        .await
        .err()
        .expect("join should fail");

    let err = err
        .downcast::<SessionError>()
        .expect("session error expected");
    assert!(matches!(err, SessionError::Media(MediaError::MediaAccess(_))));
    assert!(room.relay.members_of(&room.room_id).is_empty());
    assert!(room.relay.history().is_empty());
    assert_eq!(capture.live_streams(), 0);
}

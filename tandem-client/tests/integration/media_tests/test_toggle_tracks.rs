use tandem_client::SessionError;

use crate::integration::init_tracing;
use crate::utils::TestRoom;

/// Mute and camera-off carry over to the next camera.
#[tokio::test]
async fn test_toggle_tracks() {
    init_tracing();

    let room = TestRoom::new("r1");
    let (a, _b) = room.connect_pair().await.expect("pair did not connect");

    assert!(a.handle.set_audio_enabled(false).await.unwrap());
    assert!(a.handle.set_video_enabled(false).await.unwrap());
    a.handle.switch_camera(1).await.unwrap();

    let stream = a.capture.last_opened().unwrap();
    assert_eq!(stream.device_id(), Some("synthetic-1"));
    assert!(!stream.audio().is_enabled());
    assert!(!stream.video().is_enabled());

    assert!(a.handle.set_video_enabled(true).await.unwrap());
    assert!(stream.video().is_enabled());

    a.handle.leave().await.unwrap();
    assert_eq!(
        a.handle.set_audio_enabled(true).await,
        Err(SessionError::SessionClosed)
    );
}

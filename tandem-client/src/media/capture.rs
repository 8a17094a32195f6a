use crate::error::MediaError;
use crate::media::{DeviceDescriptor, LocalStream};
use async_trait::async_trait;

/// Platform capture layer consumed by the device manager.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Ordered list of video inputs.
    async fn enumerate_video_inputs(&self) -> Result<Vec<DeviceDescriptor>, MediaError>;

    /// Acquire one audio and one video track. `None` picks the platform default camera.
    async fn open(&self, device_id: Option<&str>) -> Result<LocalStream, MediaError>;
}

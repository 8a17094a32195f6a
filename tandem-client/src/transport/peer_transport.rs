use crate::media::LocalStream;
use crate::transport::{LinkId, TransportConfig, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

/// The connection object driven by a `PeerLink`. Only the link calls these.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Add the stream's tracks as outbound senders.
    async fn attach_stream(&self, stream: &LocalStream) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Point the existing senders at the new stream's tracks.
    async fn replace_stream(&self, stream: &LocalStream) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(
        &self,
        link: LinkId,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}

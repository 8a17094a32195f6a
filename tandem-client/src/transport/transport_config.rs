use serde::{Deserialize, Serialize};
use tandem_core::IceServerConfig;
use tandem_core::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_TURN_ADDR, DEFAULT_TURN_CREDENTIAL, DEFAULT_TURN_USERNAME,
};
use webrtc::ice_transport::ice_server::RTCIceServer;

/// Connectivity services handed to every peer connection at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl TransportConfig {
    /// No STUN/TURN at all; host candidates only. Enough for loopback.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }

    pub(crate) fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig {
                    urls: vec![DEFAULT_STUN_ADDR.to_owned()],
                    username: None,
                    credential: None,
                },
                IceServerConfig {
                    urls: vec![DEFAULT_TURN_ADDR.to_owned()],
                    username: Some(DEFAULT_TURN_USERNAME.to_owned()),
                    credential: Some(DEFAULT_TURN_CREDENTIAL.to_owned()),
                },
            ],
        }
    }
}

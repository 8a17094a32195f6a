use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tandem_core::RoomId;

pub const DEFAULT_USERNAME: &str = "Anonymous";

/// How to resolve two offers crossing for the same pair of participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlarePolicy {
    /// The participant with the lexicographically smaller id drops its own
    /// offer and answers; the other side ignores the crossing offer.
    #[default]
    LowerIdAnswers,
    /// Any offer for an already linked remote is ignored.
    IgnoreIncoming,
}

/// Settings for one room membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub room_id: RoomId,
    pub username: String,
    pub transport: TransportConfig,
    /// Upper bound for a single offer/answer/description step.
    pub negotiation_timeout_ms: u64,
    pub glare: GlarePolicy,
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl SessionConfig {
    pub fn new(room_id: impl Into<RoomId>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            room_id: room_id.into(),
            username: if username.trim().is_empty() {
                DEFAULT_USERNAME.to_owned()
            } else {
                username
            },
            ..Self::default()
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_glare_policy(mut self, glare: GlarePolicy) -> Self {
        self.glare = glare;
        self
    }

    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_id: RoomId::generate(),
            username: DEFAULT_USERNAME.to_owned(),
            transport: TransportConfig::default(),
            negotiation_timeout_ms: 10_000,
            glare: GlarePolicy::default(),
            command_capacity: 32,
            event_capacity: 64,
        }
    }
}

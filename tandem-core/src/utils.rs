/// Public reflexive-address service used when no configuration is supplied.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Relay-transport service used when direct connectivity fails.
pub const DEFAULT_TURN_ADDR: &str = "turn:openrelay.metered.ca:80";

pub const DEFAULT_TURN_USERNAME: &str = "openrelayproject";
pub const DEFAULT_TURN_CREDENTIAL: &str = "openrelayproject";

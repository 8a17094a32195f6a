//! In-memory doubles for driving sessions without a network.
//!
//! `FakeNetwork` stands in for the connection layer and records what each
//! participant applied; `ScriptedSignaling` lets a test play the remote side
//! of the relay by hand.

pub mod fake_transport;
pub mod scripted_signaling;

pub use fake_transport::{FakeNetwork, FakeTransport, FakeTransportFactory, NetworkStats};
pub use scripted_signaling::ScriptedSignaling;

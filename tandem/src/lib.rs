pub use tandem_core::model::{ParticipantId, RoomId};

pub mod model {
    pub use tandem_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use tandem_client::*;
}

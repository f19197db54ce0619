pub use homecall_core::{EndpointId, ParticipantRole, SessionToken};

pub mod model {
    pub use homecall_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use homecall_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use homecall_client::*;
}

mod endpoint;
mod ice;
mod role;
mod signaling;
mod token;

pub use endpoint::EndpointId;
pub use ice::{IceCandidate, IceServerConfig};
pub use role::ParticipantRole;
pub use signaling::{SdpKind, SessionDescription, SignalHeader, SignalKind, SignalMessage};
pub use token::{SessionToken, TokenError};

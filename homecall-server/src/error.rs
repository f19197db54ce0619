use homecall_core::SessionToken;
use thiserror::Error;

/// A frame that is malformed or makes no sense in context. Logged and dropped;
/// never fatal to the room or the connection.
#[derive(Debug, Error)]
pub enum SignalingProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("`{0}` frame carries no session token")]
    MissingToken(&'static str),

    #[error("`{0}` may only be sent by the relay")]
    RelayOnly(&'static str),

    #[error("`{kind}` from an endpoint outside room {token}")]
    NotMember { kind: &'static str, token: String },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("room {} is full (capacity {capacity})", token.redacted())]
    RoomFull {
        token: SessionToken,
        capacity: usize,
    },

    #[error(transparent)]
    Protocol(#[from] SignalingProtocolError),
}

use homecall_core::{IceCandidate, SignalMessage};

/// Everything that can move a [`crate::PeerSession`], in one queue.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Explicit user action: the operator starts the call, the guest grants media.
    Start,
    EndCall,
    /// A message delivered by the relay.
    Signal(SignalMessage),
    /// Trickled local candidate from the negotiator, to be sent to the peer.
    LocalCandidate(IceCandidate),
    /// The peer transport reports a usable connection.
    TransportConnected,
    /// The peer transport failed, disconnected or closed.
    TransportLost,
    /// The relay connection is gone for good.
    RelayLost,
}

/// User-facing notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Guest opened the invitation link.
    GuestJoined,
    /// Guest granted media and is ready to be called.
    GuestReady,
    /// Operator is waiting in the room.
    OperatorWaiting,
    MeetingData(serde_json::Value),
    PeerLeft,
    /// Guest only: leave the call view entirely.
    LeaveCallView,
    MediaUnavailable(String),
    RenegotiationRejected,
    RoomFull { capacity: usize },
}

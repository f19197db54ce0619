use std::fmt;

/// Lifecycle of one participant's side of a session.
///
/// `Idle → AcquiringLocalMedia (guest) → Negotiating → Connected → Disconnected | Failed`.
/// There is no way back from a terminal state; a dropped call needs a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PeerState {
    #[default]
    Idle,
    AcquiringLocalMedia,
    Negotiating,
    Connected,
    Disconnected,
    Failed,
}

impl PeerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    /// States in which a remote description may already be applied.
    pub fn is_negotiated(self) -> bool {
        matches!(self, Self::Negotiating | Self::Connected)
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AcquiringLocalMedia => "acquiring-local-media",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

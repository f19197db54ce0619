use serde::{Deserialize, Serialize};

use crate::model::ice::{IceCandidate, IceServerConfig};
use crate::model::token::SessionToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Every message that travels over the signaling connection.
///
/// Frames are `{"event": "<kind>", "data": {...}}`. Client-originated messages are
/// scoped to exactly one session token; `IceConfig` and `RoomFull` are produced by
/// the relay itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SignalMessage {
    JoinRoom {
        token: SessionToken,
    },
    AdminWaiting {
        token: SessionToken,
    },
    UserOpenedLink {
        token: SessionToken,
    },
    UserStartedSession {
        token: SessionToken,
    },
    Offer {
        token: SessionToken,
        description: SessionDescription,
    },
    Answer {
        token: SessionToken,
        description: SessionDescription,
    },
    IceCandidate {
        token: SessionToken,
        candidate: IceCandidate,
    },
    UserDisconnected {
        token: SessionToken,
    },
    MeetingDataAvailable {
        token: SessionToken,
        payload: serde_json::Value,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    RoomFull {
        token: SessionToken,
        capacity: usize,
    },
}

impl SignalMessage {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::JoinRoom { .. } => SignalKind::JoinRoom,
            Self::AdminWaiting { .. } => SignalKind::AdminWaiting,
            Self::UserOpenedLink { .. } => SignalKind::UserOpenedLink,
            Self::UserStartedSession { .. } => SignalKind::UserStartedSession,
            Self::Offer { .. } => SignalKind::Offer,
            Self::Answer { .. } => SignalKind::Answer,
            Self::IceCandidate { .. } => SignalKind::IceCandidate,
            Self::UserDisconnected { .. } => SignalKind::UserDisconnected,
            Self::MeetingDataAvailable { .. } => SignalKind::MeetingDataAvailable,
            Self::IceConfig { .. } => SignalKind::IceConfig,
            Self::RoomFull { .. } => SignalKind::RoomFull,
        }
    }

    pub fn token(&self) -> Option<&SessionToken> {
        match self {
            Self::JoinRoom { token }
            | Self::AdminWaiting { token }
            | Self::UserOpenedLink { token }
            | Self::UserStartedSession { token }
            | Self::Offer { token, .. }
            | Self::Answer { token, .. }
            | Self::IceCandidate { token, .. }
            | Self::UserDisconnected { token }
            | Self::MeetingDataAvailable { token, .. }
            | Self::RoomFull { token, .. } => Some(token),
            Self::IceConfig { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Discriminant of [`SignalMessage`], as it appears in the `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    JoinRoom,
    AdminWaiting,
    UserOpenedLink,
    UserStartedSession,
    Offer,
    Answer,
    IceCandidate,
    UserDisconnected,
    MeetingDataAvailable,
    IceConfig,
    RoomFull,
}

impl SignalKind {
    /// Kinds only the relay may emit. Clients sending them are misbehaving.
    pub fn is_relay_originated(self) -> bool {
        matches!(self, Self::IceConfig | Self::RoomFull)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::JoinRoom => "join-room",
            Self::AdminWaiting => "admin-waiting",
            Self::UserOpenedLink => "user-opened-link",
            Self::UserStartedSession => "user-started-session",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
            Self::UserDisconnected => "user-disconnected",
            Self::MeetingDataAvailable => "meeting-data-available",
            Self::IceConfig => "ice-config",
            Self::RoomFull => "room-full",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct HeaderData {
    #[serde(default)]
    token: Option<SessionToken>,
}

/// The part of a frame the relay needs for routing. Everything else in the frame
/// stays opaque and is forwarded untouched.
#[derive(Debug, Deserialize)]
pub struct SignalHeader {
    pub event: SignalKind,
    #[serde(default)]
    data: Option<HeaderData>,
}

impl SignalHeader {
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.data.as_ref().and_then(|d| d.token.as_ref())
    }
}

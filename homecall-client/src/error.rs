use crate::capture::ArtifactId;
use crate::session::PeerState;
use homecall_core::ParticipantRole;
use thiserror::Error;

/// Relay connection problems. The session is never resumed after one of these.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("giving up after {attempts} connection attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Inbound signaling that is well-formed but out of context. Logged and dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("message addressed to another session ({0})")]
    ForeignToken(String),

    #[error("answer received without a prior offer")]
    AnswerWithoutOffer,

    #[error("{kind} is not valid for the {role} role")]
    WrongRole {
        kind: &'static str,
        role: ParticipantRole,
    },

    #[error("unexpected {kind} in state {state}")]
    Unexpected { kind: &'static str, state: PeerState },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaAcquisitionError {
    #[error("camera or microphone access was denied")]
    PermissionDenied,

    #[error("no capture device available")]
    Unavailable,

    #[error("capture device error: {0}")]
    Device(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("signaling protocol error: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error(transparent)]
    MediaAcquisition(#[from] MediaAcquisitionError),

    #[error("peer negotiation failed: {0:#}")]
    Negotiation(anyhow::Error),

    #[error("renegotiation is not supported; a new session token is required")]
    RenegotiationUnsupported,

    #[error("room is full ({capacity} participants)")]
    RoomFull { capacity: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact store rejected the upload: {0}")]
    Rejected(String),

    #[error("artifact store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown artifact reference {0}")]
    UnknownReference(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture requires a connected session (currently {0})")]
    NotConnected(PeerState),

    #[error("no video frame received yet")]
    NoFrame,

    #[error("frame buffer of {len} bytes does not match {width}x{height} RGBA")]
    MalformedFrame { width: u32, height: u32, len: usize },

    #[error("a recording is already in progress")]
    RecordingConflict,

    #[error("no recording in progress")]
    NotRecording,

    #[error("unknown artifact {0}")]
    UnknownArtifact(ArtifactId),

    #[error("video decoding failed: {0}")]
    Decode(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("capture worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

use crate::session::{LocalMedia, SessionEvent};
use anyhow::Result;
use async_trait::async_trait;
use homecall_core::{IceCandidate, IceServerConfig, ParticipantRole, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The local negotiation object of one peer connection.
///
/// Implementations report transport progress back into the session queue
/// (`TransportConnected`, `TransportLost`, `LocalCandidate`).
#[async_trait]
pub trait Negotiator: Send + Sync {
    /// Creates an offer and applies it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Applies a remote offer, then creates and applies the local answer.
    async fn accept_offer(&self, offer: SessionDescription) -> Result<SessionDescription>;

    async fn accept_answer(&self, answer: SessionDescription) -> Result<()>;

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait NegotiatorFactory: Send + Sync {
    async fn create(
        &self,
        role: ParticipantRole,
        ice_servers: &[IceServerConfig],
        media: Option<LocalMedia>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn Negotiator>>;
}

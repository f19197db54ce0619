
use homecall_client::{
    CaptureConfig, CapturePipeline, PeerSession, PeerState, RemoteStream, SessionConfig,
    SessionDeps, SessionError, SessionEvent, SessionHandle, SessionNotice,
};
use homecall_core::{ParticipantRole, SessionToken, SignalMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::Level;

use crate::utils::{MemoryArtifactStore, MockMediaSource, MockNegotiatorFactory};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn token(raw: &str) -> SessionToken {
    SessionToken::new(raw).unwrap()
}

/// A session driven event by event, without its run loop.
pub struct SessionFixture {
    pub session: PeerSession,
    pub handle: SessionHandle,
    pub outbound: mpsc::UnboundedReceiver<SignalMessage>,
    pub negotiators: MockNegotiatorFactory,
    pub media: MockMediaSource,
    pub token: SessionToken,
}

impl SessionFixture {
    pub fn new(role: ParticipantRole) -> Self {
        Self::with(role, SessionConfig::default(), MockNegotiatorFactory::new(), MockMediaSource::granted())
    }

    pub fn with(
        role: ParticipantRole,
        config: SessionConfig,
        negotiators: MockNegotiatorFactory,
        media: MockMediaSource,
    ) -> Self {
        let token = token("T-fixture");
        let (outbound_tx, outbound) = mpsc::unbounded_channel();
        let deps = SessionDeps {
            negotiators: Arc::new(negotiators.clone()),
            media: Arc::new(media.clone()),
        };
        let (session, handle) = PeerSession::new(token.clone(), role, config, deps, outbound_tx);

        Self {
            session,
            handle,
            outbound,
            negotiators,
            media,
            token,
        }
    }

    pub async fn event(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        self.session.handle_event(event).await
    }

    pub async fn signal(&mut self, msg: SignalMessage) -> Result<(), SessionError> {
        self.event(SessionEvent::Signal(msg)).await
    }

    pub fn state(&self) -> PeerState {
        self.session.state()
    }

    /// Drains everything sent to the relay so far.
    pub fn sent(&mut self) -> Vec<SignalMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.outbound.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn notices(&mut self) -> Vec<SessionNotice> {
        let mut out = Vec::new();
        while let Some(notice) = self.handle.try_notice() {
            out.push(notice);
        }
        out
    }
}

pub struct CaptureFixture {
    pub pipeline: CapturePipeline,
    pub stream: RemoteStream,
    pub state: watch::Sender<PeerState>,
    pub store: MemoryArtifactStore,
}

impl CaptureFixture {
    pub fn connected() -> Self {
        Self::with_store(MemoryArtifactStore::new())
    }

    pub fn with_store(store: MemoryArtifactStore) -> Self {
        let stream = RemoteStream::default();
        let (state, state_rx) = watch::channel(PeerState::Connected);
        let pipeline = CapturePipeline::new(
            stream.clone(),
            state_rx,
            Arc::new(store.clone()),
            CaptureConfig::default(),
        );
        Self {
            pipeline,
            stream,
            state,
            store,
        }
    }
}

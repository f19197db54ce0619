use crate::config::{RetryPolicy, SessionConfig};
use crate::error::SessionError;
use crate::session::{PeerSession, PeerState, SessionDeps, SessionEvent, SessionNotice};
use crate::signaling::{SignalingChannel, SignalingClient};
use homecall_core::{ParticipantRole, SessionToken, SignalMessage};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The UI side of a running [`PeerSession`].
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    state: watch::Receiver<PeerState>,
    notices: mpsc::UnboundedReceiver<SessionNotice>,
}

impl SessionHandle {
    pub(crate) fn new(
        events: mpsc::Sender<SessionEvent>,
        state: watch::Receiver<PeerState>,
        notices: mpsc::UnboundedReceiver<SessionNotice>,
    ) -> Self {
        Self {
            events,
            state,
            notices,
        }
    }

    /// Returns false once the session has stopped.
    pub async fn start(&self) -> bool {
        self.events.send(SessionEvent::Start).await.is_ok()
    }

    pub async fn end_call(&self) -> bool {
        self.events.send(SessionEvent::EndCall).await.is_ok()
    }

    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events.clone()
    }

    pub fn state(&self) -> PeerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<PeerState> {
        self.state.clone()
    }

    /// Waits until the state satisfies `pred`. `None` if the session ended first
    /// without ever satisfying it.
    pub async fn wait_for(&mut self, pred: impl FnMut(&PeerState) -> bool) -> Option<PeerState> {
        self.state.wait_for(pred).await.ok().map(|s| *s)
    }

    pub async fn next_notice(&mut self) -> Option<SessionNotice> {
        self.notices.recv().await
    }

    pub fn try_notice(&mut self) -> Option<SessionNotice> {
        self.notices.try_recv().ok()
    }
}

/// Feeds relay messages into the session queue; a closed relay becomes `RelayLost`.
pub fn pump_inbound(
    mut inbound: mpsc::UnboundedReceiver<SignalMessage>,
    events: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = inbound.recv().await {
            if events.send(SessionEvent::Signal(msg)).await.is_err() {
                debug!("Session stopped; dropping inbound signaling");
                return;
            }
        }
        let _ = events.send(SessionEvent::RelayLost).await;
    })
}

/// Wires a session to an already connected relay channel and spawns it.
pub fn spawn_session(
    channel: SignalingChannel,
    token: SessionToken,
    role: ParticipantRole,
    config: SessionConfig,
    deps: SessionDeps,
) -> SessionHandle {
    let SignalingChannel { outbound, inbound } = channel;
    let (session, handle) = PeerSession::new(token, role, config, deps, outbound);

    pump_inbound(inbound, handle.events());
    tokio::spawn(session.run());
    handle
}

/// Connects to the relay at `url` and joins `token` as `role`.
pub async fn join_session(
    url: &str,
    retry: &RetryPolicy,
    token: SessionToken,
    role: ParticipantRole,
    config: SessionConfig,
    deps: SessionDeps,
) -> Result<SessionHandle, SessionError> {
    let channel = SignalingClient::connect(url, retry).await?;
    info!("Connected to relay {}", url);
    Ok(spawn_session(channel, token, role, config, deps))
}

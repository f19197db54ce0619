use crate::config::{OfferPolicy, SessionConfig};
use crate::error::{ProtocolViolation, SessionError};
use crate::session::{
    LocalMedia, MediaSource, Negotiator, NegotiatorFactory, PeerState, SessionEvent,
    SessionHandle, SessionNotice,
};
use homecall_core::{
    IceCandidate, ParticipantRole, SessionDescription, SessionToken, SignalMessage,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Collaborators a session needs besides its channels.
#[derive(Clone)]
pub struct SessionDeps {
    pub negotiators: Arc<dyn NegotiatorFactory>,
    pub media: Arc<dyn MediaSource>,
}

/// Explicit state machine for one participant of one session token.
///
/// All input arrives as [`SessionEvent`]s on a single queue and is handled one at a
/// time. Output leaves through the outbound signaling channel, the state watch and
/// the notice channel.
pub struct PeerSession {
    token: SessionToken,
    role: ParticipantRole,
    config: SessionConfig,
    deps: SessionDeps,

    state: watch::Sender<PeerState>,
    outbound: mpsc::UnboundedSender<SignalMessage>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,

    negotiator: Option<Arc<dyn Negotiator>>,
    local_media: Option<LocalMedia>,
    offer_sent: bool,
    remote_description_set: bool,
    pending_candidates: Vec<IceCandidate>,
    pending_offer: Option<SessionDescription>,
}

impl PeerSession {
    pub fn new(
        token: SessionToken,
        role: ParticipantRole,
        config: SessionConfig,
        deps: SessionDeps,
        outbound: mpsc::UnboundedSender<SignalMessage>,
    ) -> (Self, SessionHandle) {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let (state, state_rx) = watch::channel(PeerState::Idle);
        let (notices, notices_rx) = mpsc::unbounded_channel();

        let handle = SessionHandle::new(events_tx.clone(), state_rx, notices_rx);
        let session = Self {
            token,
            role,
            config,
            deps,
            state,
            outbound,
            notices,
            events_tx,
            events_rx,
            negotiator: None,
            local_media: None,
            offer_sent: false,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            pending_offer: None,
        };
        (session, handle)
    }

    pub fn state(&self) -> PeerState {
        *self.state.borrow()
    }

    pub fn role(&self) -> ParticipantRole {
        self.role
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub async fn run(mut self) {
        info!(
            "Session {} started as {}",
            self.token.redacted(),
            self.role
        );
        self.announce();

        while let Some(event) = self.events_rx.recv().await {
            if let Err(e) = self.handle_event(event).await {
                match e {
                    SessionError::Protocol(_) => warn!("Dropping signal: {}", e),
                    _ => error!("Session {}: {}", self.token.redacted(), e),
                }
            }
            if self.state().is_terminal() {
                break;
            }
        }

        info!(
            "Session {} finished in state {}",
            self.token.redacted(),
            self.state()
        );
    }

    /// `join-room`, then the role's presence message.
    pub fn announce(&self) {
        self.send(SignalMessage::JoinRoom {
            token: self.token.clone(),
        });
        let presence = match self.role {
            ParticipantRole::Operator => SignalMessage::AdminWaiting {
                token: self.token.clone(),
            },
            ParticipantRole::Guest => SignalMessage::UserOpenedLink {
                token: self.token.clone(),
            },
        };
        self.send(presence);
    }

    /// Presence sent before the operator joined was dropped by the relay, so the
    /// guest repeats it for the operator that just arrived.
    fn reannounce(&self) {
        self.send(SignalMessage::UserOpenedLink {
            token: self.token.clone(),
        });
        if self.local_media.is_some() && self.negotiator.is_none() && self.pending_offer.is_none()
        {
            self.send(SignalMessage::UserStartedSession {
                token: self.token.clone(),
            });
        }
    }

    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let state = self.state();
        if state.is_terminal() {
            debug!("Ignoring {:?} in terminal state {}", event, state);
            return Ok(());
        }

        match event {
            SessionEvent::Start => self.start().await,

            SessionEvent::EndCall => {
                info!("Ending call {}", self.token.redacted());
                self.send(SignalMessage::UserDisconnected {
                    token: self.token.clone(),
                });
                self.disconnect().await;
                Ok(())
            }

            SessionEvent::Signal(msg) => self.handle_signal(msg).await,

            SessionEvent::LocalCandidate(candidate) => {
                self.send(SignalMessage::IceCandidate {
                    token: self.token.clone(),
                    candidate,
                });
                Ok(())
            }

            SessionEvent::TransportConnected => {
                if state == PeerState::Negotiating {
                    self.set_state(PeerState::Connected);
                } else {
                    debug!("Transport connected in state {}", state);
                }
                Ok(())
            }

            SessionEvent::TransportLost => {
                if self.negotiator.is_some() {
                    warn!("Peer transport lost for {}", self.token.redacted());
                    self.disconnect().await;
                }
                Ok(())
            }

            SessionEvent::RelayLost => {
                warn!("Relay connection lost for {}", self.token.redacted());
                self.disconnect().await;
                Ok(())
            }
        }
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        match (self.role, self.state()) {
            (ParticipantRole::Operator, PeerState::Idle) => self.offer().await,
            (ParticipantRole::Guest, PeerState::Idle) => self.acquire_media().await,
            (_, state) => {
                debug!("Start ignored in state {}", state);
                Ok(())
            }
        }
    }

    async fn offer(&mut self) -> Result<(), SessionError> {
        self.set_state(PeerState::Negotiating);

        let offer = match self.create_negotiator(None).await {
            Ok(negotiator) => negotiator.create_offer().await,
            Err(e) => Err(e),
        };
        let description = match offer {
            Ok(d) => d,
            Err(e) => return Err(self.negotiation_failed(e).await),
        };

        self.offer_sent = true;
        self.send(SignalMessage::Offer {
            token: self.token.clone(),
            description,
        });
        info!("Offer sent for {}", self.token.redacted());
        Ok(())
    }

    async fn acquire_media(&mut self) -> Result<(), SessionError> {
        self.set_state(PeerState::AcquiringLocalMedia);

        let media = match self.deps.media.acquire().await {
            Ok(m) => m,
            Err(e) => {
                error!("Local media unavailable: {}", e);
                self.notify(SessionNotice::MediaUnavailable(e.to_string()));
                self.set_state(PeerState::Failed);
                return Err(e.into());
            }
        };

        info!("Local media ready ({} track(s))", media.tracks.len());
        self.local_media = Some(media);
        self.send(SignalMessage::UserStartedSession {
            token: self.token.clone(),
        });

        match self.pending_offer.take() {
            Some(offer) => self.answer(offer).await,
            None => Ok(()),
        }
    }

    async fn answer(&mut self, offer: SessionDescription) -> Result<(), SessionError> {
        self.set_state(PeerState::Negotiating);

        let answer = match self.create_negotiator(self.local_media.clone()).await {
            Ok(negotiator) => negotiator.accept_offer(offer).await,
            Err(e) => Err(e),
        };
        let description = match answer {
            Ok(d) => d,
            Err(e) => return Err(self.negotiation_failed(e).await),
        };

        self.remote_description_set = true;
        self.send(SignalMessage::Answer {
            token: self.token.clone(),
            description,
        });
        info!("Answer sent for {}", self.token.redacted());

        self.flush_candidates().await;
        Ok(())
    }

    async fn handle_signal(&mut self, msg: SignalMessage) -> Result<(), SessionError> {
        let state = self.state();

        if let SignalMessage::IceConfig { ice_servers } = msg {
            debug!("Received ICE config: {} server(s)", ice_servers.len());
            self.config.ice_servers = ice_servers;
            return Ok(());
        }

        if msg.token() != Some(&self.token) {
            let other = msg.token().map(SessionToken::redacted).unwrap_or_default();
            return Err(ProtocolViolation::ForeignToken(other).into());
        }

        debug!("Signal {} in state {}", msg.kind().as_str(), state);

        match (self.role, msg) {
            (_, SignalMessage::IceCandidate { candidate, .. }) => {
                self.add_candidate(candidate).await;
                Ok(())
            }

            (_, SignalMessage::UserDisconnected { .. }) => {
                info!("Peer left {}", self.token.redacted());
                self.notify(SessionNotice::PeerLeft);
                self.disconnect().await;
                Ok(())
            }

            (_, SignalMessage::RoomFull { capacity, .. }) => {
                self.notify(SessionNotice::RoomFull { capacity });
                self.close_negotiator().await;
                self.set_state(PeerState::Failed);
                Err(SessionError::RoomFull { capacity })
            }

            (ParticipantRole::Operator, SignalMessage::UserOpenedLink { .. }) => {
                self.notify(SessionNotice::GuestJoined);
                Ok(())
            }

            (ParticipantRole::Operator, SignalMessage::UserStartedSession { .. }) => {
                self.notify(SessionNotice::GuestReady);
                if self.config.auto_start && state == PeerState::Idle {
                    self.offer().await
                } else {
                    Ok(())
                }
            }

            (ParticipantRole::Operator, SignalMessage::MeetingDataAvailable { payload, .. }) => {
                self.notify(SessionNotice::MeetingData(payload));
                Ok(())
            }

            (ParticipantRole::Operator, SignalMessage::Answer { description, .. }) => {
                self.accept_answer(description).await
            }

            (ParticipantRole::Guest, SignalMessage::AdminWaiting { .. }) => {
                self.notify(SessionNotice::OperatorWaiting);
                self.reannounce();
                Ok(())
            }

            (ParticipantRole::Guest, SignalMessage::Offer { description, .. }) => {
                self.receive_offer(description).await
            }

            (role, msg) => Err(ProtocolViolation::WrongRole {
                kind: msg.kind().as_str(),
                role,
            }
            .into()),
        }
    }

    async fn receive_offer(&mut self, offer: SessionDescription) -> Result<(), SessionError> {
        let state = self.state();

        if state.is_negotiated() || self.pending_offer.is_some() {
            return match self.config.offer_policy {
                OfferPolicy::Reject => {
                    warn!("Rejecting renegotiation offer in state {}", state);
                    self.notify(SessionNotice::RenegotiationRejected);
                    Err(SessionError::RenegotiationUnsupported)
                }
                OfferPolicy::Ignore => {
                    debug!("Ignoring renegotiation offer in state {}", state);
                    Ok(())
                }
            };
        }

        if self.local_media.is_none() {
            debug!("Holding offer until local media is ready");
            self.pending_offer = Some(offer);
            return Ok(());
        }

        self.answer(offer).await
    }

    async fn accept_answer(&mut self, answer: SessionDescription) -> Result<(), SessionError> {
        let state = self.state();
        if !self.offer_sent {
            return Err(ProtocolViolation::AnswerWithoutOffer.into());
        }
        if self.remote_description_set {
            return Err(ProtocolViolation::Unexpected {
                kind: "answer",
                state,
            }
            .into());
        }
        let Some(negotiator) = self.negotiator.clone() else {
            return Err(ProtocolViolation::AnswerWithoutOffer.into());
        };

        if let Err(e) = negotiator.accept_answer(answer).await {
            return Err(self.negotiation_failed(e).await);
        }
        self.remote_description_set = true;
        info!("Answer applied for {}", self.token.redacted());

        self.flush_candidates().await;
        Ok(())
    }

    async fn add_candidate(&mut self, candidate: IceCandidate) {
        match &self.negotiator {
            Some(negotiator) if self.remote_description_set => {
                if let Err(e) = negotiator.add_candidate(candidate).await {
                    warn!("Failed to apply remote candidate: {:#}", e);
                }
            }
            _ => {
                debug!(
                    "Buffering remote candidate ({} pending)",
                    self.pending_candidates.len() + 1
                );
                self.pending_candidates.push(candidate);
            }
        }
    }

    async fn flush_candidates(&mut self) {
        let Some(negotiator) = self.negotiator.clone() else {
            return;
        };
        let pending = std::mem::take(&mut self.pending_candidates);
        if !pending.is_empty() {
            debug!("Applying {} buffered candidate(s)", pending.len());
        }
        for candidate in pending {
            if let Err(e) = negotiator.add_candidate(candidate).await {
                warn!("Failed to apply buffered candidate: {:#}", e);
            }
        }
    }

    async fn create_negotiator(
        &mut self,
        media: Option<LocalMedia>,
    ) -> anyhow::Result<Arc<dyn Negotiator>> {
        let negotiator = self
            .deps
            .negotiators
            .create(
                self.role,
                &self.config.ice_servers,
                media,
                self.events_tx.clone(),
            )
            .await?;
        self.negotiator = Some(negotiator.clone());
        Ok(negotiator)
    }

    /// Both sides end up disconnected: tell the peer, then tear down locally.
    async fn negotiation_failed(&mut self, e: anyhow::Error) -> SessionError {
        self.send(SignalMessage::UserDisconnected {
            token: self.token.clone(),
        });
        self.disconnect().await;
        SessionError::Negotiation(e)
    }

    async fn disconnect(&mut self) {
        self.close_negotiator().await;
        self.pending_candidates.clear();
        self.pending_offer = None;
        self.set_state(PeerState::Disconnected);

        if self.role == ParticipantRole::Guest {
            self.notify(SessionNotice::LeaveCallView);
        }
    }

    async fn close_negotiator(&mut self) {
        if let Some(negotiator) = self.negotiator.take() {
            if let Err(e) = negotiator.close().await {
                warn!("Failed to close peer connection: {:#}", e);
            }
        }
    }

    fn set_state(&self, next: PeerState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!(
                "Session {}: {} -> {}",
                self.token.redacted(),
                prev,
                next
            );
        }
    }

    fn send(&self, msg: SignalMessage) {
        if self.outbound.send(msg).is_err() {
            error!("Outbound signaling channel closed");
        }
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notices.send(notice);
    }
}

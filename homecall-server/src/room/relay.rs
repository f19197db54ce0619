use crate::config::RelayConfig;
use crate::error::{RelayError, SignalingProtocolError};
use crate::room::relay_command::{RelayCommand, RelaySnapshot};
use crate::room::room_registry::{JoinOutcome, RoomRegistry};
use crate::signaling::{Frame, SignalingOutput};
use homecall_core::{EndpointId, SessionToken, SignalHeader, SignalKind, SignalMessage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// The signaling relay: one event loop per process.
///
/// Frames are forwarded verbatim to the other members of the sender's room; only
/// members may send into a room. Delivery is best-effort and at most once; a room
/// with no other member swallows the frame silently.
pub struct Relay {
    registry: RoomRegistry,
    memberships: HashMap<EndpointId, HashSet<SessionToken>>,
    command_rx: mpsc::Receiver<RelayCommand>,
    output: Arc<dyn SignalingOutput>,
    room_idle_timeout: Duration,
    sweep_interval: Duration,
}

impl Relay {
    pub fn new(
        command_rx: mpsc::Receiver<RelayCommand>,
        output: Arc<dyn SignalingOutput>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(config.room_capacity),
            memberships: HashMap::new(),
            command_rx,
            output,
            room_idle_timeout: config.room_idle_timeout,
            sweep_interval: config.sweep_interval,
        }
    }

    pub async fn run(mut self) {
        info!("Relay event loop started");

        let mut sweep = time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down relay.");
                            break;
                        }
                    }
                }

                _ = sweep.tick() => {
                    self.sweep();
                }
            }
        }

        info!("Relay event loop finished");
    }

    async fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Frame { endpoint, frame } => {
                if let Err(e) = self.handle_frame(endpoint, frame).await {
                    match e {
                        RelayError::RoomFull { .. } => info!("Join from {} refused: {}", endpoint, e),
                        RelayError::Protocol(_) => warn!("Dropping frame from {}: {}", endpoint, e),
                    }
                }
            }

            RelayCommand::Disconnect { endpoint } => {
                self.disconnect(endpoint).await;
            }

            RelayCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Routes one inbound frame. Only the envelope (`event`, `data.token`) is read.
    pub async fn handle_frame(&mut self, sender: EndpointId, frame: Frame) -> Result<(), RelayError> {
        let header = SignalHeader::parse(&frame).map_err(SignalingProtocolError::Malformed)?;

        if header.event.is_relay_originated() {
            return Err(SignalingProtocolError::RelayOnly(header.event.as_str()).into());
        }
        let Some(token) = header.token().cloned() else {
            return Err(SignalingProtocolError::MissingToken(header.event.as_str()).into());
        };

        if header.event == SignalKind::JoinRoom {
            self.join(&token, sender).await?;
            return Ok(());
        }

        let is_member = self
            .registry
            .room(&token)
            .is_some_and(|room| room.contains(&sender));
        if !is_member {
            return Err(SignalingProtocolError::NotMember {
                kind: header.event.as_str(),
                token: token.redacted(),
            }
            .into());
        }

        let delivered = self.relay(&token, &frame, sender).await;
        debug!(
            "Relayed {} for {} from {} to {} endpoint(s)",
            header.event.as_str(),
            token.redacted(),
            sender,
            delivered
        );
        Ok(())
    }

    pub async fn join(
        &mut self,
        token: &SessionToken,
        endpoint: EndpointId,
    ) -> Result<JoinOutcome, RelayError> {
        match self.registry.join(token, endpoint) {
            Ok(outcome) => {
                self.memberships
                    .entry(endpoint)
                    .or_default()
                    .insert(token.clone());
                info!(
                    "Endpoint {} joined room {} ({:?}, {} member(s))",
                    endpoint,
                    token.redacted(),
                    outcome,
                    self.registry.members(token).len()
                );
                Ok(outcome)
            }
            Err(e) => {
                let notice = SignalMessage::RoomFull {
                    token: token.clone(),
                    capacity: self.registry.capacity(),
                };
                self.output.send_signal(endpoint, &notice).await;
                Err(e)
            }
        }
    }

    /// Delivers `frame` to every member of `token`'s room except `sender`.
    /// Returns the number of recipients; zero is not an error.
    pub async fn relay(&self, token: &SessionToken, frame: &Frame, sender: EndpointId) -> usize {
        let recipients = self.registry.recipients(token, &sender);
        for recipient in &recipients {
            self.output.deliver(*recipient, frame.clone()).await;
        }
        recipients.len()
    }

    /// Transport closed: leave every room and tell whoever is left.
    pub async fn disconnect(&mut self, endpoint: EndpointId) {
        let tokens = self.memberships.remove(&endpoint).unwrap_or_default();
        info!(
            "Endpoint {} disconnected, leaving {} room(s)",
            endpoint,
            tokens.len()
        );

        for token in tokens {
            self.registry.leave(&token, &endpoint);

            let notice = SignalMessage::UserDisconnected {
                token: token.clone(),
            };
            for recipient in self.registry.members(&token) {
                self.output.send_signal(*recipient, &notice).await;
            }
        }
    }

    pub fn sweep(&mut self) -> usize {
        let swept = self
            .registry
            .sweep(Instant::now(), self.room_idle_timeout);
        if !swept.is_empty() {
            info!("Swept {} idle room(s)", swept.len());
        }
        swept.len()
    }

    pub fn snapshot(&self) -> RelaySnapshot {
        RelaySnapshot {
            rooms: self.registry.room_count(),
            endpoints: self.memberships.len(),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }
}

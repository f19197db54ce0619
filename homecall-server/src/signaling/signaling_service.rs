use crate::config::RelayConfig;
use crate::room::{Relay, RelayCommand, RelaySnapshot};
use crate::signaling::{Frame, SignalingOutput};
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use homecall_core::{EndpointId, IceServerConfig};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

struct SignalingInner {
    peers: DashMap<EndpointId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Connection table shared by the WebSocket handlers, and the relay's way out.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    pub(crate) relay_tx: mpsc::Sender<RelayCommand>,
}

impl SignalingService {
    pub fn new(relay_tx: mpsc::Sender<RelayCommand>, ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
            relay_tx,
        }
    }

    /// Builds the service together with its relay loop and spawns the loop.
    pub fn start(config: &RelayConfig) -> Self {
        let (relay_tx, relay_rx) = mpsc::channel(config.command_buffer);
        let service = Self::new(relay_tx, config.ice_servers.clone());

        let relay = Relay::new(relay_rx, Arc::new(service.clone()), config);
        tokio::spawn(relay.run());
        info!("Relay started (room capacity {})", config.room_capacity);

        service
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_peer(&self, endpoint: EndpointId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(endpoint, tx);
    }

    pub fn remove_peer(&self, endpoint: &EndpointId) {
        self.inner.peers.remove(endpoint);
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub async fn submit(&self, cmd: RelayCommand) -> bool {
        if let Err(e) = self.relay_tx.send(cmd).await {
            error!("Relay loop is gone: {}", e);
            return false;
        }
        true
    }

    pub async fn snapshot(&self) -> Option<RelaySnapshot> {
        let (reply, rx) = oneshot::channel();
        if !self.submit(RelayCommand::Snapshot { reply }).await {
            return None;
        }
        rx.await.ok()
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn deliver(&self, endpoint: EndpointId, frame: Frame) {
        if let Some(peer) = self.inner.peers.get(&endpoint) {
            if let Err(e) = peer.send(Message::Text(frame.to_string().into())) {
                error!("Failed to send WS message to {}: {:?}", endpoint, e);
            }
        } else {
            warn!("Attempted to send signal to disconnected endpoint {}", endpoint);
        }
    }
}

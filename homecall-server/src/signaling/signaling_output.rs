use async_trait::async_trait;
use homecall_core::{EndpointId, SignalMessage};
use std::sync::Arc;
use tracing::error;

/// One signaling frame, exactly as its sender wrote it.
pub type Frame = Arc<str>;

/// Implemented by the transport layer (WebSocket server) so the relay can push
/// frames to connected endpoints.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queue a frame for one endpoint. Endpoints that already went away are skipped.
    async fn deliver(&self, endpoint: EndpointId, frame: Frame);

    /// Serialize and deliver a message produced by the relay itself.
    async fn send_signal(&self, endpoint: EndpointId, msg: &SignalMessage) {
        match msg.to_json() {
            Ok(json) => self.deliver(endpoint, Frame::from(json)).await,
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }
}

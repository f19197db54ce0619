use homecall_core::EndpointId;
use tokio::sync::oneshot;

use crate::signaling::Frame;

/// Input of the relay event loop, produced by the transport layer.
#[derive(Debug)]
pub enum RelayCommand {
    /// A text frame arrived on an endpoint's connection.
    Frame { endpoint: EndpointId, frame: Frame },

    /// The endpoint's transport closed.
    Disconnect { endpoint: EndpointId },

    /// Report current occupancy.
    Snapshot { reply: oneshot::Sender<RelaySnapshot> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RelaySnapshot {
    pub rooms: usize,
    pub endpoints: usize,
}

use crate::room::RelayCommand;
use crate::signaling::{Frame, SignalingOutput, SignalingService};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use homecall_core::{EndpointId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    let endpoint = EndpointId::new();

    ws.on_upgrade(move |socket| handle_socket(socket, endpoint, service))
}

async fn handle_socket(socket: WebSocket, endpoint: EndpointId, service: SignalingService) {
    info!("New WebSocket connection: {}", endpoint);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_peer(endpoint, tx);

    let ice_config = SignalMessage::IceConfig {
        ice_servers: service.get_ice_servers(),
    };
    service.send_signal(endpoint, &ice_config).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        let cmd = RelayCommand::Frame {
                            endpoint,
                            frame: Frame::from(text.as_str()),
                        };
                        if !service.submit(cmd).await {
                            break;
                        }
                    }
                    Message::Binary(_) => {
                        warn!("Ignoring binary frame from {}", endpoint);
                    }
                    Message::Close(_) => break,
                    _ => debug!("Control frame from {}", endpoint),
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(&endpoint);
    service
        .submit(RelayCommand::Disconnect { endpoint })
        .await;
    info!("WebSocket disconnected: {}", endpoint);
}

use crate::config::RetryPolicy;
use crate::error::TransportError;
use futures::{SinkExt, StreamExt};
use homecall_core::SignalMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Both directions of an established relay connection.
///
/// `inbound` closes when the socket ends. Dropping every `outbound` sender closes
/// the socket.
pub struct SignalingChannel {
    pub outbound: mpsc::UnboundedSender<SignalMessage>,
    pub inbound: mpsc::UnboundedReceiver<SignalMessage>,
}

pub struct SignalingClient;

impl SignalingClient {
    pub async fn connect(url: &str, policy: &RetryPolicy) -> Result<SignalingChannel, TransportError> {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match connect_async(url).await {
                Ok((stream, _)) => {
                    info!("Relay connection established on attempt {}", attempt);
                    return Ok(Self::split(stream));
                }
                Err(e) if attempt >= attempts => {
                    error!("Relay unreachable after {} attempt(s): {}", attempt, e);
                    return Err(TransportError::RetriesExhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        "Relay connection attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn split<S>(stream: tokio_tungstenite::WebSocketStream<S>) -> SignalingChannel
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_tx, mut ws_rx) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<SignalMessage>();

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let json = match msg.to_json() {
                    Ok(j) => j,
                    Err(e) => {
                        error!("Failed to encode {}: {}", msg.kind().as_str(), e);
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                    warn!("Relay send failed: {}", e);
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = ws_rx.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<SignalMessage>(text.as_str()) {
                            Ok(msg) => {
                                if inbound_tx.send(msg).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Dropping malformed relay frame: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay connection error: {}", e);
                        break;
                    }
                }
            }
            debug!("Relay reader finished");
        });

        SignalingChannel {
            outbound: outbound_tx,
            inbound: inbound_rx,
        }
    }
}

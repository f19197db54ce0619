use anyhow::{Result, bail};
use async_trait::async_trait;
use homecall_client::{LocalMedia, Negotiator, NegotiatorFactory, SessionEvent};
use homecall_core::{IceCandidate, IceServerConfig, ParticipantRole, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Clone, PartialEq)]
pub enum NegotiatorCall {
    Create {
        role: ParticipantRole,
        with_media: bool,
    },
    CreateOffer,
    AcceptOffer(String),
    AcceptAnswer(String),
    AddCandidate(String),
    Close,
}

/// Records every call in a log shared with its factory.
pub struct MockNegotiator {
    calls: Arc<Mutex<Vec<NegotiatorCall>>>,
    role: ParticipantRole,
}

#[async_trait]
impl Negotiator for MockNegotiator {
    async fn create_offer(&self) -> Result<SessionDescription> {
        self.calls.lock().await.push(NegotiatorCall::CreateOffer);
        Ok(SessionDescription::offer(format!("sdp-offer-{}", self.role)))
    }

    async fn accept_offer(&self, offer: SessionDescription) -> Result<SessionDescription> {
        self.calls
            .lock()
            .await
            .push(NegotiatorCall::AcceptOffer(offer.sdp));
        Ok(SessionDescription::answer(format!("sdp-answer-{}", self.role)))
    }

    async fn accept_answer(&self, answer: SessionDescription) -> Result<()> {
        self.calls
            .lock()
            .await
            .push(NegotiatorCall::AcceptAnswer(answer.sdp));
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.calls
            .lock()
            .await
            .push(NegotiatorCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.calls.lock().await.push(NegotiatorCall::Close);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockNegotiatorFactory {
    calls: Arc<Mutex<Vec<NegotiatorCall>>>,
    events: Arc<Mutex<Option<mpsc::Sender<SessionEvent>>>>,
    fail: Arc<AtomicBool>,
}

impl MockNegotiatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `create` fails.
    pub fn failing() -> Self {
        let factory = Self::default();
        factory.fail.store(true, Ordering::SeqCst);
        factory
    }

    pub async fn calls(&self) -> Vec<NegotiatorCall> {
        self.calls.lock().await.clone()
    }

    /// Remote candidates applied so far, in order.
    pub async fn applied_candidates(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                NegotiatorCall::AddCandidate(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Simulates a transport state report from the created negotiator.
    pub async fn report(&self, event: SessionEvent) {
        let tx = self.events.lock().await.clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl NegotiatorFactory for MockNegotiatorFactory {
    async fn create(
        &self,
        role: ParticipantRole,
        _ice_servers: &[IceServerConfig],
        media: Option<LocalMedia>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn Negotiator>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("peer connection construction failed");
        }
        self.calls.lock().await.push(NegotiatorCall::Create {
            role,
            with_media: media.is_some(),
        });
        *self.events.lock().await = Some(events);

        Ok(Arc::new(MockNegotiator {
            calls: self.calls.clone(),
            role,
        }))
    }
}

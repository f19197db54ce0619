use homecall_client::{
    OfferPolicy, PeerState, SessionConfig, SessionError, SessionEvent, SessionNotice,
};
use homecall_core::{ParticipantRole, SessionDescription, SignalMessage};

use crate::integration::{SessionFixture, init_tracing};
use crate::utils::{MockMediaSource, MockNegotiatorFactory};

async fn connected_guest(policy: OfferPolicy) -> SessionFixture {
    let mut f = SessionFixture::with(
        ParticipantRole::Guest,
        SessionConfig {
            offer_policy: policy,
            ..Default::default()
        },
        MockNegotiatorFactory::new(),
        MockMediaSource::granted(),
    );
    let t = f.token.clone();

    f.event(SessionEvent::Start).await.unwrap();
    f.signal(SignalMessage::Offer {
        token: t,
        description: SessionDescription::offer("sdp-first"),
    })
    .await
    .unwrap();
    f.event(SessionEvent::TransportConnected).await.unwrap();
    assert_eq!(f.state(), PeerState::Connected);
    f.sent();
    f.notices();
    f
}

fn second_offer(f: &SessionFixture) -> SignalMessage {
    SignalMessage::Offer {
        token: f.token.clone(),
        description: SessionDescription::offer("sdp-second"),
    }
}

#[tokio::test]
async fn test_second_offer_rejected() {
    init_tracing();

    let mut f = connected_guest(OfferPolicy::Reject).await;
    let calls_before = f.negotiators.calls().await;

    let offer = second_offer(&f);
    let err = f.signal(offer).await.unwrap_err();

    assert!(matches!(err, SessionError::RenegotiationUnsupported));
    assert_eq!(f.state(), PeerState::Connected);
    assert!(f.sent().is_empty());
    assert_eq!(f.notices(), vec![SessionNotice::RenegotiationRejected]);
    assert_eq!(f.negotiators.calls().await, calls_before);
}

#[tokio::test]
async fn test_second_offer_ignored() {
    init_tracing();

    let mut f = connected_guest(OfferPolicy::Ignore).await;
    let calls_before = f.negotiators.calls().await;

    let offer = second_offer(&f);
    f.signal(offer).await.unwrap();

    assert_eq!(f.state(), PeerState::Connected);
    assert!(f.sent().is_empty());
    assert!(f.notices().is_empty());
    assert_eq!(f.negotiators.calls().await, calls_before);
}

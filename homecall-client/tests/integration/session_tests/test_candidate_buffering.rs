use homecall_client::{PeerState, SessionEvent};
use homecall_core::{IceCandidate, ParticipantRole, SessionDescription, SignalMessage};

use crate::integration::{SessionFixture, init_tracing};

fn candidate(f: &SessionFixture, n: u8) -> SignalMessage {
    SignalMessage::IceCandidate {
        token: f.token.clone(),
        candidate: IceCandidate::new(format!("candidate:{} 1 udp 1 10.0.0.{} 9 typ host", n, n)),
    }
}

fn name(n: u8) -> String {
    format!("candidate:{} 1 udp 1 10.0.0.{} 9 typ host", n, n)
}

#[tokio::test]
async fn test_operator_buffers_until_answer() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Operator);
    let t = f.token.clone();

    // Before any negotiator exists
    let c1 = candidate(&f, 1);
    f.signal(c1).await.unwrap();

    f.event(SessionEvent::Start).await.unwrap();

    // Negotiator exists, but no remote description yet
    let c2 = candidate(&f, 2);
    let c3 = candidate(&f, 3);
    f.signal(c2).await.unwrap();
    f.signal(c3).await.unwrap();
    assert_eq!(f.session.pending_candidates(), 3);
    assert!(f.negotiators.applied_candidates().await.is_empty());

    f.signal(SignalMessage::Answer {
        token: t.clone(),
        description: SessionDescription::answer("sdpB"),
    })
    .await
    .unwrap();

    assert_eq!(f.session.pending_candidates(), 0);
    assert_eq!(
        f.negotiators.applied_candidates().await,
        vec![name(1), name(2), name(3)]
    );

    // Late candidates after connecting are applied, not discarded
    f.event(SessionEvent::TransportConnected).await.unwrap();
    assert_eq!(f.state(), PeerState::Connected);
    let c4 = candidate(&f, 4);
    f.signal(c4).await.unwrap();
    assert_eq!(f.negotiators.applied_candidates().await.len(), 4);
}

#[tokio::test]
async fn test_guest_buffers_until_offer() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Guest);
    let t = f.token.clone();

    let c1 = candidate(&f, 1);
    f.signal(c1.clone()).await.unwrap();
    f.event(SessionEvent::Start).await.unwrap();
    f.signal(c1).await.unwrap();
    assert_eq!(f.session.pending_candidates(), 2);

    f.signal(SignalMessage::Offer {
        token: t.clone(),
        description: SessionDescription::offer("sdpA"),
    })
    .await
    .unwrap();

    // Duplicates are applied as received
    assert_eq!(
        f.negotiators.applied_candidates().await,
        vec![name(1), name(1)]
    );
}

#[tokio::test]
async fn test_local_candidates_are_trickled() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Operator);
    let t = f.token.clone();

    f.event(SessionEvent::Start).await.unwrap();
    f.sent();

    let local = IceCandidate::new("candidate:9 1 udp 1 192.168.1.2 5000 typ host");
    f.event(SessionEvent::LocalCandidate(local.clone()))
        .await
        .unwrap();

    assert_eq!(
        f.sent(),
        vec![SignalMessage::IceCandidate {
            token: t,
            candidate: local,
        }]
    );
}

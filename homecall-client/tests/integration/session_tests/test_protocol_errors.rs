use homecall_client::{PeerState, ProtocolViolation, SessionError, SessionEvent};
use homecall_core::{ParticipantRole, SessionDescription, SignalMessage};

use crate::integration::{SessionFixture, init_tracing, token};

#[tokio::test]
async fn test_answer_without_offer() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Operator);
    let t = f.token.clone();

    let err = f
        .signal(SignalMessage::Answer {
            token: t,
            description: SessionDescription::answer("sdpB"),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolViolation::AnswerWithoutOffer)
    ));
    assert_eq!(f.state(), PeerState::Idle);
    assert!(f.negotiators.calls().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_answer_is_dropped() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Operator);
    let t = f.token.clone();
    let answer = SignalMessage::Answer {
        token: t,
        description: SessionDescription::answer("sdpB"),
    };

    f.event(SessionEvent::Start).await.unwrap();
    f.signal(answer.clone()).await.unwrap();
    let err = f.signal(answer).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolViolation::Unexpected { kind: "answer", .. })
    ));
    assert_eq!(f.state(), PeerState::Negotiating);
}

#[tokio::test]
async fn test_messages_for_wrong_role() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Operator);
    let t = f.token.clone();

    let err = f
        .signal(SignalMessage::Offer {
            token: t.clone(),
            description: SessionDescription::offer("sdpA"),
        })
        .await
        .unwrap_err();
    assert_eq!(
        match err {
            SessionError::Protocol(v) => v,
            other => panic!("unexpected error {other}"),
        },
        ProtocolViolation::WrongRole {
            kind: "offer",
            role: ParticipantRole::Operator,
        }
    );

    let mut g = SessionFixture::new(ParticipantRole::Guest);
    let err = g
        .signal(SignalMessage::MeetingDataAvailable {
            token: g.token.clone(),
            payload: serde_json::Value::Null,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolViolation::WrongRole { .. })
    ));
    assert_eq!(f.state(), PeerState::Idle);
    assert_eq!(g.state(), PeerState::Idle);
}

#[tokio::test]
async fn test_foreign_token_is_dropped() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Operator);

    let err = f
        .signal(SignalMessage::UserDisconnected {
            token: token("T-someone-else"),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolViolation::ForeignToken(_))
    ));
    assert_eq!(f.state(), PeerState::Idle);
}

#[tokio::test]
async fn test_ice_config_replaces_servers() {
    init_tracing();

    let mut f = SessionFixture::new(ParticipantRole::Operator);
    f.signal(SignalMessage::IceConfig {
        ice_servers: vec![homecall_core::IceServerConfig::stun(vec![
            "stun:relay.example:3478".to_owned(),
        ])],
    })
    .await
    .unwrap();

    assert_eq!(f.state(), PeerState::Idle);
    assert!(f.sent().is_empty());
}

use homecall_core::{EndpointId, SignalMessage};
use homecall_server::{RelayError, SignalingProtocolError};

use crate::integration::{create_test_relay, frame, init_tracing, join, token};

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    init_tracing();

    let (mut relay, signaling, _rx) = create_test_relay();
    let t = token("T-bad");
    let operator = EndpointId::new();
    let guest = EndpointId::new();
    join(&mut relay, &t, operator).await;
    join(&mut relay, &t, guest).await;

    let err = relay.handle_frame(guest, "{not json".into()).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Protocol(SignalingProtocolError::Malformed(_))
    ));

    let err = relay
        .handle_frame(guest, r#"{"event":"teleport","data":{"token":"T-bad"}}"#.into())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RelayError::Protocol(SignalingProtocolError::Malformed(_))
    ));

    let err = relay
        .handle_frame(guest, r#"{"event":"user-started-session","data":{}}"#.into())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RelayError::Protocol(SignalingProtocolError::MissingToken(_))
    ));

    assert_eq!(signaling.total().await, 0);
}

#[tokio::test]
async fn test_relay_only_kinds_are_rejected() {
    init_tracing();

    let (mut relay, signaling, _rx) = create_test_relay();
    let t = token("T-spoof");
    let operator = EndpointId::new();
    let guest = EndpointId::new();
    join(&mut relay, &t, operator).await;
    join(&mut relay, &t, guest).await;

    let spoof = SignalMessage::RoomFull {
        token: t.clone(),
        capacity: 2,
    };
    let err = relay.handle_frame(guest, frame(&spoof)).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Protocol(SignalingProtocolError::RelayOnly(_))
    ));
    assert_eq!(signaling.total().await, 0);
}

#[tokio::test]
async fn test_frame_to_empty_room_is_swallowed() {
    init_tracing();

    let (mut relay, signaling, _rx) = create_test_relay();
    let t = token("T-alone");
    let operator = EndpointId::new();
    join(&mut relay, &t, operator).await;

    relay
        .handle_frame(operator, frame(&SignalMessage::AdminWaiting { token: t.clone() }))
        .await
        .unwrap();

    assert_eq!(signaling.total().await, 0);
}

#[tokio::test]
async fn test_frames_from_non_members_are_rejected() {
    init_tracing();

    let (mut relay, signaling, _rx) = create_test_relay();
    let t = token("T-members");
    let operator = EndpointId::new();
    let stranger = EndpointId::new();
    join(&mut relay, &t, operator).await;

    let err = relay
        .handle_frame(
            stranger,
            frame(&SignalMessage::UserStartedSession { token: t.clone() }),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RelayError::Protocol(SignalingProtocolError::NotMember { .. })
    ));

    // Token with no room at all
    let err = relay
        .handle_frame(
            operator,
            frame(&SignalMessage::AdminWaiting {
                token: token("T-nowhere"),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RelayError::Protocol(SignalingProtocolError::NotMember { .. })
    ));

    assert_eq!(signaling.total().await, 0);
}

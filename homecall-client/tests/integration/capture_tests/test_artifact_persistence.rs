use homecall_client::{CaptureError, MediaKind, Persistence, StoreError, VideoFrame};
use uuid::Uuid;

use crate::integration::{CaptureFixture, init_tracing};
use crate::utils::{MemoryArtifactStore, opus_packet, vp8_keyframe, vp8_packet};

async fn screenshot(f: &mut CaptureFixture) -> homecall_client::ArtifactId {
    f.stream
        .publish_frame(VideoFrame::new(4, 4, vec![7u8; 64]).unwrap());
    f.pipeline.screenshot().await.unwrap()
}

#[tokio::test]
async fn test_delete_unpersisted_is_local() {
    init_tracing();

    let mut f = CaptureFixture::connected();
    let id = screenshot(&mut f).await;

    let remote = f.pipeline.delete(id).unwrap();
    assert!(remote.is_none());
    assert!(f.pipeline.artifacts().is_empty());
    assert_eq!(f.store.len().await, 0);
}

#[tokio::test]
async fn test_persist_then_delete() {
    init_tracing();

    let mut f = CaptureFixture::connected();
    let id = screenshot(&mut f).await;

    let reference = f.pipeline.persist(id).await.unwrap();
    assert!(f.store.contains(&reference).await);
    assert_eq!(
        f.pipeline.artifacts().get(&id).unwrap().persistence,
        Persistence::Persisted(reference.clone())
    );
    let stored = f.store.get(&reference).await.unwrap();
    assert_eq!(stored.parts.len(), 1);
    assert_eq!(stored.parts[0].content_type, "image/png");
    assert!(stored.duration.is_none());

    // Persisting twice returns the same reference without a new upload
    assert_eq!(f.pipeline.persist(id).await.unwrap(), reference);
    assert_eq!(f.store.len().await, 1);

    let remote = f.pipeline.delete(id).unwrap().expect("remote delete expected");
    assert!(f.pipeline.artifacts().is_empty());
    remote.await.unwrap().unwrap();
    assert!(!f.store.contains(&reference).await);
}

#[tokio::test]
async fn test_failed_remote_delete_stays_removed() {
    init_tracing();

    let mut f = CaptureFixture::with_store(MemoryArtifactStore::with_failing_deletes());
    let keep = screenshot(&mut f).await;
    let id = screenshot(&mut f).await;
    f.pipeline.persist(id).await.unwrap();

    let remote = f.pipeline.delete(id).unwrap().unwrap();
    let result = remote.await.unwrap();

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    assert!(f.pipeline.artifacts().get(&id).is_none());
    assert_eq!(f.pipeline.artifacts().position(&keep), Some(0));
}

#[tokio::test]
async fn test_persist_recording_carries_duration() {
    init_tracing();

    let mut f = CaptureFixture::connected();
    f.pipeline.start_recording().unwrap();
    f.stream.publish_packet(
        MediaKind::Video,
        vp8_packet(1, &vp8_keyframe(16, 16, b"payload")),
    );
    f.stream.publish_packet(MediaKind::Audio, opus_packet(1));
    let id = f.pipeline.stop_recording().await.unwrap();

    let reference = f.pipeline.persist(id).await.unwrap();
    let stored = f.store.get(&reference).await.unwrap();
    let types: Vec<_> = stored.parts.iter().map(|p| p.content_type).collect();
    assert_eq!(types, vec!["video/x-ivf", "audio/ogg"]);
    assert!(stored.parts[0].payload.starts_with(b"DKIF"));
    assert!(stored.parts[1].payload.starts_with(b"OggS"));
    assert!(stored.duration.is_some());
}

#[tokio::test]
async fn test_persist_audio_only_recording() {
    init_tracing();

    let mut f = CaptureFixture::connected();
    f.pipeline.start_recording().unwrap();
    f.stream.publish_packet(MediaKind::Audio, opus_packet(1));
    let id = f.pipeline.stop_recording().await.unwrap();

    let reference = f.pipeline.persist(id).await.unwrap();
    let stored = f.store.get(&reference).await.unwrap();
    assert_eq!(stored.parts.len(), 1);
    assert_eq!(stored.parts[0].content_type, "audio/ogg");
}

#[tokio::test]
async fn test_unknown_artifact() {
    init_tracing();

    let mut f = CaptureFixture::connected();
    let missing = homecall_client::ArtifactId(Uuid::new_v4());

    assert!(matches!(
        f.pipeline.delete(missing),
        Err(CaptureError::UnknownArtifact(_))
    ));
    assert!(matches!(
        f.pipeline.persist(missing).await,
        Err(CaptureError::UnknownArtifact(_))
    ));
}

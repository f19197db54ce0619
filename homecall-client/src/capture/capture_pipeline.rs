use crate::capture::{
    ActiveRecording, ArtifactContent, ArtifactId, ArtifactList, ArtifactRef, ArtifactStore,
    ArtifactUpload, CaptureArtifact, Persistence, Recording, RemoteStream, Screenshot,
    UploadPart, render_screenshot,
};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, StoreError};
use crate::session::PeerState;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Produces screenshots and recordings from the live remote stream.
///
/// Client-local: the only network activity is the explicit hand-off to the
/// [`ArtifactStore`] in [`CapturePipeline::persist`] and [`CapturePipeline::delete`].
pub struct CapturePipeline {
    stream: RemoteStream,
    peer_state: watch::Receiver<PeerState>,
    store: Arc<dyn ArtifactStore>,
    config: CaptureConfig,
    artifacts: ArtifactList,
    recording: Option<ActiveRecording>,
}

impl CapturePipeline {
    pub fn new(
        stream: RemoteStream,
        peer_state: watch::Receiver<PeerState>,
        store: Arc<dyn ArtifactStore>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            stream,
            peer_state,
            store,
            config,
            artifacts: ArtifactList::default(),
            recording: None,
        }
    }

    pub fn artifacts(&self) -> &ArtifactList {
        &self.artifacts
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn ensure_connected(&self) -> Result<(), CaptureError> {
        match *self.peer_state.borrow() {
            PeerState::Connected => Ok(()),
            other => Err(CaptureError::NotConnected(other)),
        }
    }

    /// Captures the latest frame. Allowed during an active recording.
    pub async fn screenshot(&mut self) -> Result<ArtifactId, CaptureError> {
        self.ensure_connected()?;
        let frame = self.stream.latest_frame().ok_or(CaptureError::NoFrame)?;
        let captured_at = Utc::now();

        let config = self.config.clone();
        let rendered =
            tokio::task::spawn_blocking(move || render_screenshot(&frame, &config)).await??;

        info!(
            "Screenshot captured at {}x{} ({} bytes)",
            rendered.width,
            rendered.height,
            rendered.png.len()
        );
        let artifact = CaptureArtifact::new(ArtifactContent::Screenshot(Screenshot {
            png: rendered.png,
            width: rendered.width,
            height: rendered.height,
            captured_at,
        }));
        Ok(self.artifacts.push_newest(artifact))
    }

    /// At most one recording at a time; a second start leaves the first untouched.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.recording.is_some() {
            warn!("Recording already in progress");
            return Err(CaptureError::RecordingConflict);
        }
        self.ensure_connected()?;

        self.recording = Some(ActiveRecording::start(
            &self.stream,
            self.config.slice_interval,
        ));
        Ok(())
    }

    /// Works after the call dropped too; sealed slices are kept.
    pub async fn stop_recording(&mut self) -> Result<ArtifactId, CaptureError> {
        let active = self.recording.take().ok_or(CaptureError::NotRecording)?;
        let finished = active.stop().await;

        let artifact = CaptureArtifact::new(ArtifactContent::Recording(Recording {
            video: finished.video,
            audio: finished.audio,
            started_at: finished.started_at,
            duration: finished.duration,
            slices: finished.slices,
        }));
        Ok(self.artifacts.push_newest(artifact))
    }

    /// Hands the artifact to the store and records the returned reference.
    pub async fn persist(&mut self, id: ArtifactId) -> Result<ArtifactRef, CaptureError> {
        let artifact = self
            .artifacts
            .get(&id)
            .ok_or(CaptureError::UnknownArtifact(id))?;
        if let Some(existing) = artifact.reference() {
            return Ok(existing.clone());
        }

        let upload = match &artifact.content {
            ArtifactContent::Screenshot(s) => ArtifactUpload {
                parts: vec![UploadPart {
                    payload: s.png.clone(),
                    content_type: "image/png",
                }],
                captured_at: s.captured_at,
                duration: None,
            },
            ArtifactContent::Recording(r) => {
                let parts = [(&r.video, "video/x-ivf"), (&r.audio, "audio/ogg")]
                    .into_iter()
                    .filter(|(payload, _)| !payload.is_empty())
                    .map(|(payload, content_type)| UploadPart {
                        payload: payload.clone(),
                        content_type,
                    })
                    .collect();
                ArtifactUpload {
                    parts,
                    captured_at: r.started_at,
                    duration: Some(r.duration),
                }
            }
        };

        let reference = self.store.upload(upload).await?;
        info!("Artifact {} persisted as {}", id, reference);

        if let Some(artifact) = self.artifacts.get_mut(&id) {
            artifact.persistence = Persistence::Persisted(reference.clone());
        }
        Ok(reference)
    }

    /// Removes locally right away. For persisted artifacts the remote delete runs
    /// in the background; its failure never brings the entry back.
    pub fn delete(
        &mut self,
        id: ArtifactId,
    ) -> Result<Option<JoinHandle<Result<(), StoreError>>>, CaptureError> {
        let artifact = self
            .artifacts
            .remove(&id)
            .ok_or(CaptureError::UnknownArtifact(id))?;
        info!("Artifact {} removed", id);

        Ok(match artifact.persistence {
            Persistence::Local => None,
            Persistence::Persisted(reference) => Some(self.spawn_remote_delete(id, reference)),
        })
    }

    fn spawn_remote_delete(
        &self,
        id: ArtifactId,
        reference: ArtifactRef,
    ) -> JoinHandle<Result<(), StoreError>> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let result = store.delete(reference.clone()).await;
            if let Err(e) = &result {
                warn!("Remote delete of {} ({}) failed: {}", id, reference, e);
            }
            result
        })
    }
}

use crate::error::MediaAcquisitionError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Local tracks handed to the negotiator. Cloning shares the tracks.
#[derive(Clone, Default)]
pub struct LocalMedia {
    pub tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        Self { tracks }
    }
}

impl fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMedia")
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

/// Camera and microphone access for the guest.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self) -> Result<LocalMedia, MediaAcquisitionError>;
}

/// Sample-fed VP8 video and Opus audio tracks. The embedding capture loop writes
/// encoded samples into [`SampleTrackSource::video`] and [`SampleTrackSource::audio`].
pub struct SampleTrackSource {
    video: Arc<TrackLocalStaticSample>,
    audio: Arc<TrackLocalStaticSample>,
}

impl SampleTrackSource {
    pub fn new(stream_id: &str) -> Self {
        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.to_owned(),
        ));
        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.to_owned(),
        ));
        Self { video, audio }
    }

    pub fn video(&self) -> Arc<TrackLocalStaticSample> {
        self.video.clone()
    }

    pub fn audio(&self) -> Arc<TrackLocalStaticSample> {
        self.audio.clone()
    }
}

#[async_trait]
impl MediaSource for SampleTrackSource {
    async fn acquire(&self) -> Result<LocalMedia, MediaAcquisitionError> {
        Ok(LocalMedia::new(vec![
            self.video.clone() as Arc<dyn TrackLocal + Send + Sync>,
            self.audio.clone() as Arc<dyn TrackLocal + Send + Sync>,
        ]))
    }
}

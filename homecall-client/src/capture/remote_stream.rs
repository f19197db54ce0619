use crate::error::CaptureError;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use webrtc::rtp::packet::Packet;

/// One decoded RGBA8 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    rgba: Bytes,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgba: impl Into<Bytes>) -> Result<Self, CaptureError> {
        let rgba = rgba.into();
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        if width == 0 || height == 0 || expected != Some(rgba.len()) {
            return Err(CaptureError::MalformedFrame {
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &Bytes {
        &self.rgba
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Opus.
    Audio,
    /// VP8.
    Video,
}

/// One RTP packet of a remote track, as received.
#[derive(Debug, Clone)]
pub struct MediaPacket {
    pub kind: MediaKind,
    pub packet: Packet,
}

struct StreamInner {
    frames: watch::Sender<Option<VideoFrame>>,
    media: broadcast::Sender<MediaPacket>,
}

/// The live remote stream, shared read-only with the capture pipeline.
///
/// Holds the latest decoded frame and fans out the RTP packets of the remote
/// tracks. Both are written by the negotiator.
#[derive(Clone)]
pub struct RemoteStream {
    inner: Arc<StreamInner>,
}

impl RemoteStream {
    pub fn new(media_buffer: usize) -> Self {
        let (frames, _) = watch::channel(None);
        let (media, _) = broadcast::channel(media_buffer.max(1));
        Self {
            inner: Arc::new(StreamInner { frames, media }),
        }
    }

    pub fn publish_frame(&self, frame: VideoFrame) {
        self.inner.frames.send_replace(Some(frame));
    }

    /// Returns the number of subscribers that will see the packet.
    pub fn publish_packet(&self, kind: MediaKind, packet: Packet) -> usize {
        self.inner
            .media
            .send(MediaPacket { kind, packet })
            .unwrap_or(0)
    }

    pub fn latest_frame(&self) -> Option<VideoFrame> {
        self.inner.frames.borrow().clone()
    }

    pub fn subscribe_media(&self) -> broadcast::Receiver<MediaPacket> {
        self.inner.media.subscribe()
    }
}

impl Default for RemoteStream {
    fn default() -> Self {
        Self::new(1024)
    }
}

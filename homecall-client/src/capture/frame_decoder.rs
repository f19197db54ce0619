use crate::capture::VideoFrame;
use crate::error::CaptureError;

/// Turns complete VP8 frames from the remote video track into pixels.
///
/// The `webrtc` negotiator reassembles each frame from its RTP packets and hands it
/// to the decoder on a blocking worker, one frame at a time and in order. Whatever
/// comes back is published as the stream's latest frame, which is what screenshots
/// sample. Without a decoder the stream never has a frame and screenshots report
/// [`CaptureError::NoFrame`].
///
/// `Ok(None)` means no picture yet, e.g. an inter frame before the first keyframe.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, frame: &[u8]) -> Result<Option<VideoFrame>, CaptureError>;
}

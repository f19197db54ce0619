use bytes::Bytes;
use homecall_client::{CaptureError, FrameDecoder, VideoFrame, vp8};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use webrtc::rtp::header::Header;
use webrtc::rtp::packet::Packet;

/// Smallest VP8 keyframe header the containers and `vp8` helpers accept.
pub fn vp8_keyframe(width: u16, height: u16, body: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x00, 0x00, 0x00, 0x9d, 0x01, 0x2a];
    frame.extend_from_slice(&width.to_le_bytes());
    frame.extend_from_slice(&height.to_le_bytes());
    frame.extend_from_slice(body);
    frame
}

pub fn vp8_inter(body: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x01, 0x00, 0x00];
    frame.extend_from_slice(body);
    frame
}

/// A whole VP8 frame in a single RTP packet.
pub fn vp8_packet(sequence_number: u16, frame: &[u8]) -> Packet {
    let mut payload = vec![0x10];
    payload.extend_from_slice(frame);
    Packet {
        header: Header {
            version: 2,
            marker: true,
            payload_type: 96,
            sequence_number,
            timestamp: u32::from(sequence_number) * 3000,
            ssrc: 0x5eed,
            ..Default::default()
        },
        payload: Bytes::from(payload),
    }
}

/// One 20 ms Opus packet.
pub fn opus_packet(sequence_number: u16) -> Packet {
    Packet {
        header: Header {
            version: 2,
            payload_type: 111,
            sequence_number,
            timestamp: u32::from(sequence_number) * 960,
            ssrc: 0xa0d1,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0xfc, 0xff, 0xfe]),
    }
}

/// Paints keyframes a flat 2x2 grey, rejects truncated frames and counts what it saw.
#[derive(Clone, Default)]
pub struct MockFrameDecoder {
    decoded: Arc<AtomicUsize>,
}

impl MockFrameDecoder {
    pub fn decoded(&self) -> usize {
        self.decoded.load(Ordering::SeqCst)
    }
}

impl FrameDecoder for MockFrameDecoder {
    fn decode(&self, frame: &[u8]) -> Result<Option<VideoFrame>, CaptureError> {
        self.decoded.fetch_add(1, Ordering::SeqCst);
        if frame.len() < 3 {
            return Err(CaptureError::Decode(format!("{}-byte frame", frame.len())));
        }
        if vp8::keyframe_size(frame).is_none() {
            return Ok(None);
        }
        VideoFrame::new(2, 2, vec![0x80; 16]).map(Some)
    }
}

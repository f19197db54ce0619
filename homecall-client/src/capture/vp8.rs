//! Just enough of the VP8 bitstream to tell keyframes apart and size a container.

const START_CODE: [u8; 3] = [0x9d, 0x01, 0x2a];

/// Frame tag bit 0 is the inverse keyframe flag.
pub fn is_keyframe(frame: &[u8]) -> bool {
    frame.first().is_some_and(|tag| tag & 0x01 == 0)
}

/// Picture size carried in a keyframe header. `None` for inter frames and
/// truncated data.
pub fn keyframe_size(frame: &[u8]) -> Option<(u16, u16)> {
    if !is_keyframe(frame) || frame.len() < 10 || frame[3..6] != START_CODE {
        return None;
    }
    let width = u16::from_le_bytes([frame[6], frame[7]]) & 0x3fff;
    let height = u16::from_le_bytes([frame[8], frame[9]]) & 0x3fff;
    Some((width, height))
}

#[cfg(test)]
pub(crate) fn test_keyframe(width: u16, height: u16, body: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x00, 0x00, 0x00];
    frame.extend_from_slice(&START_CODE);
    frame.extend_from_slice(&width.to_le_bytes());
    frame.extend_from_slice(&height.to_le_bytes());
    frame.extend_from_slice(body);
    frame
}

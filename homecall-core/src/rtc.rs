use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::model::{IceCandidate, SdpKind, SessionDescription};

impl From<IceCandidate> for RTCIceCandidateInit {
    fn from(c: IceCandidate) -> Self {
        RTCIceCandidateInit {
            candidate: c.candidate,
            sdp_mid: c.sdp_mid,
            sdp_mline_index: c.sdp_m_line_index,
            username_fragment: c.username_fragment,
        }
    }
}

impl From<RTCIceCandidateInit> for IceCandidate {
    fn from(c: RTCIceCandidateInit) -> Self {
        IceCandidate {
            candidate: c.candidate,
            sdp_mid: c.sdp_mid,
            sdp_m_line_index: c.sdp_mline_index,
            username_fragment: c.username_fragment,
        }
    }
}

impl TryFrom<&SessionDescription> for RTCSessionDescription {
    type Error = webrtc::Error;

    fn try_from(desc: &SessionDescription) -> Result<Self, Self::Error> {
        match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp.clone()),
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp.clone()),
        }
    }
}

impl SessionDescription {
    /// `None` for pranswer/rollback descriptions, which this protocol never exchanges.
    pub fn from_rtc(desc: &RTCSessionDescription) -> Option<Self> {
        match desc.sdp_type {
            RTCSdpType::Offer => Some(Self::offer(desc.sdp.clone())),
            RTCSdpType::Answer => Some(Self::answer(desc.sdp.clone())),
            _ => None,
        }
    }
}

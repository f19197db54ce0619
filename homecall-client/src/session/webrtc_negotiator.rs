use crate::capture::{FrameDecoder, MediaKind, RemoteStream};
use crate::config::RtcOptions;
use crate::session::{LocalMedia, Negotiator, NegotiatorFactory, SessionEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use homecall_core::{IceCandidate, IceServerConfig, ParticipantRole, SessionDescription};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice::network_type::NetworkType;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::io::sample_builder::SampleBuilder;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use webrtc::rtp::codecs::vp8::Vp8Packet;
use webrtc::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType,
};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCPFeedback, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

const VP8_CLOCK_RATE: u32 = 90_000;
/// Sequence numbers the sample builder waits for a late packet.
const MAX_LATE_PACKETS: u16 = 128;

/// Builds [`WebRtcNegotiator`]s that publish remote media into a shared [`RemoteStream`].
pub struct WebRtcNegotiatorFactory {
    remote: RemoteStream,
    decoder: Option<Arc<dyn FrameDecoder>>,
    options: RtcOptions,
}

impl WebRtcNegotiatorFactory {
    pub fn new(remote: RemoteStream) -> Self {
        Self {
            remote,
            decoder: None,
            options: RtcOptions::default(),
        }
    }

    /// Decodes received video into the stream's latest frame.
    pub fn with_decoder(mut self, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn with_options(mut self, options: RtcOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl NegotiatorFactory for WebRtcNegotiatorFactory {
    async fn create(
        &self,
        role: ParticipantRole,
        ice_servers: &[IceServerConfig],
        media: Option<LocalMedia>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn Negotiator>> {
        let negotiator = WebRtcNegotiator::new(
            role,
            ice_servers,
            media,
            RemoteSink {
                stream: self.remote.clone(),
                decoder: self.decoder.clone(),
            },
            &self.options,
            events,
        )
        .await?;
        Ok(Arc::new(negotiator))
    }
}

/// Where a negotiator delivers what it receives.
#[derive(Clone)]
pub struct RemoteSink {
    pub stream: RemoteStream,
    pub decoder: Option<Arc<dyn FrameDecoder>>,
}

/// [`Negotiator`] backed by a `webrtc` peer connection.
///
/// Only VP8 and Opus are negotiated. The operator side receives both tracks,
/// publishes every RTP packet to the [`RemoteStream`] and, with a decoder, keeps
/// the stream's latest frame current.
pub struct WebRtcNegotiator {
    peer_connection: Arc<RTCPeerConnection>,
}

fn media_engine() -> Result<MediaEngine> {
    let mut m = MediaEngine::default();
    m.register_codec(
        RTCRtpCodecParameters {
            capability: RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
                rtcp_feedback: vec![],
            },
            payload_type: 111,
            ..Default::default()
        },
        RTPCodecType::Audio,
    )?;

    let feedback = [("goog-remb", ""), ("ccm", "fir"), ("nack", ""), ("nack", "pli")]
        .into_iter()
        .map(|(typ, parameter)| RTCPFeedback {
            typ: typ.to_owned(),
            parameter: parameter.to_owned(),
        })
        .collect();
    m.register_codec(
        RTCRtpCodecParameters {
            capability: RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: VP8_CLOCK_RATE,
                channels: 0,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: feedback,
            },
            payload_type: 96,
            ..Default::default()
        },
        RTPCodecType::Video,
    )?;
    Ok(m)
}

impl WebRtcNegotiator {
    pub async fn new(
        role: ParticipantRole,
        ice_servers: &[IceServerConfig],
        media: Option<LocalMedia>,
        remote: RemoteSink,
        options: &RtcOptions,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Self> {
        let mut m = media_engine()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut settings = SettingEngine::default();
        if options.loopback_candidates {
            settings.set_include_loopback_candidate(true);
            settings.set_network_types(vec![NetworkType::Udp4]);
        }

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        match role {
            ParticipantRole::Operator => {
                for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                    peer_connection
                        .add_transceiver_from_kind(
                            kind,
                            Some(RTCRtpTransceiverInit {
                                direction: RTCRtpTransceiverDirection::Recvonly,
                                send_encodings: vec![],
                            }),
                        )
                        .await?;
                }
            }
            ParticipantRole::Guest => {
                let media = media.context("guest negotiator requires local media")?;
                for track in media.tracks {
                    let sender = peer_connection.add_track(track).await?;
                    // RTCP must be drained for interceptors to work
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 1500];
                        while sender.read(&mut buf).await.is_ok() {}
                    });
                }
            }
        }

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed: {:?}", s);
                    let event = match s {
                        RTCPeerConnectionState::Connected => SessionEvent::TransportConnected,
                        RTCPeerConnectionState::Failed
                        | RTCPeerConnectionState::Disconnected
                        | RTCPeerConnectionState::Closed => SessionEvent::TransportLost,
                        _ => return,
                    };
                    let _ = tx.send(event).await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx
                            .send(SessionEvent::LocalCandidate(IceCandidate::from(init)))
                            .await;
                    }
                    Err(e) => warn!("Failed to serialize local candidate: {}", e),
                }
            })
        }));

        let pc = Arc::downgrade(&peer_connection);
        let options = options.clone();
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, _transceiver| {
            let remote = remote.clone();
            let pc = pc.clone();
            let options = options.clone();

            Box::pin(async move {
                info!(
                    "Remote track received: {} ({})",
                    track.kind(),
                    track.codec().capability.mime_type
                );
                match track.kind() {
                    RTPCodecType::Audio => {
                        tokio::spawn(forward_audio(track, remote.stream));
                    }
                    RTPCodecType::Video => {
                        tokio::spawn(request_keyframes(
                            pc,
                            track.ssrc(),
                            options.keyframe_interval,
                        ));
                        tokio::spawn(forward_video(track, remote, options.decode_queue));
                    }
                    other => warn!("Ignoring remote track of kind {}", other),
                }
            })
        }));

        Ok(Self { peer_connection })
    }
}

async fn forward_audio(track: Arc<TrackRemote>, stream: RemoteStream) {
    while let Ok((packet, _)) = track.read_rtp().await {
        stream.publish_packet(MediaKind::Audio, packet);
    }
    debug!("Remote track {} ended", track.id());
}

async fn forward_video(track: Arc<TrackRemote>, remote: RemoteSink, decode_queue: usize) {
    let RemoteSink { stream, decoder } = remote;

    let mut frames = decoder.map(|decoder| {
        let (frame_tx, frame_rx) = mpsc::channel(decode_queue.max(1));
        tokio::spawn(decode_frames(frame_rx, decoder, stream.clone()));
        (
            SampleBuilder::new(MAX_LATE_PACKETS, Vp8Packet::default(), VP8_CLOCK_RATE),
            frame_tx,
        )
    });

    while let Ok((packet, _)) = track.read_rtp().await {
        if let Some((builder, frame_tx)) = frames.as_mut() {
            builder.push(packet.clone());
            while let Some(sample) = builder.pop() {
                if frame_tx.try_send(sample.data).is_err() {
                    debug!("Decoder busy, frame dropped");
                }
            }
        }
        stream.publish_packet(MediaKind::Video, packet);
    }
    debug!("Remote track {} ended", track.id());
}

/// Decodes one frame at a time, in arrival order.
async fn decode_frames(
    mut frame_rx: mpsc::Receiver<Bytes>,
    decoder: Arc<dyn FrameDecoder>,
    stream: RemoteStream,
) {
    while let Some(frame) = frame_rx.recv().await {
        let decoder = decoder.clone();
        match tokio::task::spawn_blocking(move || decoder.decode(&frame)).await {
            Ok(Ok(Some(decoded))) => stream.publish_frame(decoded),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => debug!("Frame not decoded: {}", e),
            Err(e) => {
                warn!("Decoder worker failed: {}", e);
                break;
            }
        }
    }
}

/// Without periodic keyframes a decoder that missed the first one never catches up.
async fn request_keyframes(
    pc: Weak<RTCPeerConnection>,
    media_ssrc: u32,
    interval: std::time::Duration,
) {
    if interval.is_zero() {
        return;
    }
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let Some(pc) = pc.upgrade() else { break };
        let pli = PictureLossIndication {
            sender_ssrc: 0,
            media_ssrc,
        };
        if pc.write_rtcp(&[Box::new(pli)]).await.is_err() {
            break;
        }
    }
}

fn to_rtc(desc: &SessionDescription) -> Result<RTCSessionDescription> {
    RTCSessionDescription::try_from(desc).context("invalid session description")
}

fn from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescription> {
    SessionDescription::from_rtc(desc).context("unsupported local description type")
}

#[async_trait]
impl Negotiator for WebRtcNegotiator {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        from_rtc(&offer)
    }

    async fn accept_offer(&self, offer: SessionDescription) -> Result<SessionDescription> {
        self.peer_connection
            .set_remote_description(to_rtc(&offer)?)
            .await?;
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        from_rtc(&answer)
    }

    async fn accept_answer(&self, answer: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc(&answer)?)
            .await?;
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(candidate.into())
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

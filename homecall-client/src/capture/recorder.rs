use crate::capture::{MediaKind, MediaPacket, RemoteStream, vp8};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use webrtc::media::io::Writer;
use webrtc::media::io::ivf_reader::IVFFileHeader;
use webrtc::media::io::ivf_writer::IVFWriter;
use webrtc::media::io::ogg_writer::OggWriter;
use webrtc::rtp::codecs::vp8::Vp8Packet;
use webrtc::rtp::packet::Packet;
use webrtc::rtp::packetizer::Depacketizer;

const OPUS_SAMPLE_RATE: u32 = 48_000;
const OPUS_CHANNELS: u8 = 2;
const IVF_FRAME_RATE: u32 = 30;

/// Container bytes of one track, cut into slices while the recording runs.
///
/// Shared between the recorder task, which writes through a container writer, and
/// the [`ActiveRecording`], so whatever was sealed outlives the task.
#[derive(Clone, Default)]
pub struct SliceSink {
    inner: Arc<Mutex<SinkState>>,
}

#[derive(Default)]
struct SinkState {
    buf: Cursor<Vec<u8>>,
    /// End offset of each sealed slice.
    boundaries: Vec<usize>,
}

impl SliceSink {
    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seals everything written since the previous seal. False if nothing was.
    pub fn seal(&self) -> bool {
        let mut state = self.state();
        let end = state.buf.get_ref().len();
        if end == state.boundaries.last().copied().unwrap_or(0) {
            return false;
        }
        state.boundaries.push(end);
        true
    }

    pub fn slices(&self) -> usize {
        self.state().boundaries.len()
    }

    /// Sealed slices, concatenated.
    pub fn sealed(&self) -> Bytes {
        let state = self.state();
        let end = state.boundaries.last().copied().unwrap_or(0);
        Bytes::copy_from_slice(&state.buf.get_ref()[..end])
    }
}

impl Write for SliceSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.state().buf.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Container writers patch their headers on close.
impl Seek for SliceSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.state().buf.seek(pos)
    }
}

/// Output of a stopped recorder.
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    /// IVF container with the VP8 track. Empty if no keyframe arrived.
    pub video: Bytes,
    /// Ogg container with the Opus track. Empty if no audio arrived.
    pub audio: Bytes,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub slices: usize,
}

/// One in-flight recording: a task muxing remote packets into containers, sealed
/// into time slices.
pub struct ActiveRecording {
    started: Instant,
    started_at: DateTime<Utc>,
    video: SliceSink,
    audio: SliceSink,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ActiveRecording {
    pub fn start(stream: &RemoteStream, slice_interval: Duration) -> Self {
        let video = SliceSink::default();
        let audio = SliceSink::default();
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(record_slices(
            stream.subscribe_media(),
            TrackWriters::new(video.clone(), audio.clone()),
            slice_interval,
            stop_rx,
        ));

        info!("Recording started");
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            video,
            audio,
            stop_tx,
            task,
        }
    }

    pub fn sealed_slices(&self) -> usize {
        self.video.slices() + self.audio.slices()
    }

    /// Closes the containers and returns everything sealed.
    pub async fn stop(self) -> FinishedRecording {
        let duration = Instant::now().saturating_duration_since(self.started);

        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            warn!("Recorder task ended abnormally: {}", e);
        }

        let finished = FinishedRecording {
            video: self.video.sealed(),
            audio: self.audio.sealed(),
            started_at: self.started_at,
            duration,
            slices: self.video.slices() + self.audio.slices(),
        };
        info!(
            "Recording stopped after {:?} ({} slice(s), {} video bytes, {} audio bytes)",
            duration,
            finished.slices,
            finished.video.len(),
            finished.audio.len()
        );
        finished
    }
}

/// Per-track container writers, opened on the first usable packet of each track.
struct TrackWriters {
    video_sink: SliceSink,
    audio_sink: SliceSink,
    video: Option<IVFWriter<SliceSink>>,
    audio: Option<OggWriter<SliceSink>>,
    last_audio_timestamp: Option<u32>,
}

impl TrackWriters {
    fn new(video_sink: SliceSink, audio_sink: SliceSink) -> Self {
        Self {
            video_sink,
            audio_sink,
            video: None,
            audio: None,
            last_audio_timestamp: None,
        }
    }

    fn write(&mut self, media: &MediaPacket) {
        let result = match media.kind {
            MediaKind::Video => self.write_video(&media.packet),
            MediaKind::Audio => self.write_audio(&media.packet),
        };
        if let Err(e) = result {
            debug!("Dropping {:?} packet: {}", media.kind, e);
        }
    }

    fn write_video(&mut self, packet: &Packet) -> Result<(), webrtc::media::Error> {
        if self.video.is_none() {
            // The container opens on a keyframe; its header carries the picture size.
            let Some((width, height)) = keyframe_head(&packet.payload) else {
                return Ok(());
            };
            let header = IVFFileHeader {
                signature: *b"DKIF",
                version: 0,
                header_size: 32,
                four_cc: *b"VP80",
                width,
                height,
                timebase_denominator: IVF_FRAME_RATE,
                timebase_numerator: 1,
                num_frames: 0,
                unused: 0,
            };
            self.video = Some(IVFWriter::new(self.video_sink.clone(), &header)?);
            debug!("Video track recording at {}x{}", width, height);
        }
        match self.video.as_mut() {
            Some(writer) => writer.write_rtp(packet),
            None => Ok(()),
        }
    }

    fn write_audio(&mut self, packet: &Packet) -> Result<(), webrtc::media::Error> {
        let timestamp = packet.header.timestamp;
        if let Some(last) = self.last_audio_timestamp {
            // The granule position only moves forward.
            if (timestamp.wrapping_sub(last) as i32) < 0 {
                return Ok(());
            }
            // RTP clock wrapped: end this logical stream and chain a new one.
            if timestamp < last {
                if let Some(mut writer) = self.audio.take() {
                    writer.close()?;
                }
            }
        }
        self.last_audio_timestamp = Some(timestamp);

        if self.audio.is_none() {
            self.audio = Some(OggWriter::new(
                self.audio_sink.clone(),
                OPUS_SAMPLE_RATE,
                OPUS_CHANNELS,
            )?);
        }
        match self.audio.as_mut() {
            Some(writer) => writer.write_rtp(packet),
            None => Ok(()),
        }
    }

    fn seal(&self) -> usize {
        usize::from(self.video_sink.seal()) + usize::from(self.audio_sink.seal())
    }

    fn close(&mut self) {
        if let Some(mut writer) = self.video.take() {
            if let Err(e) = writer.close() {
                warn!("Failed to finalize video container: {}", e);
            }
        }
        if let Some(mut writer) = self.audio.take() {
            if let Err(e) = writer.close() {
                warn!("Failed to finalize audio container: {}", e);
            }
        }
        self.seal();
    }
}

/// Picture size if `payload` starts a VP8 keyframe.
fn keyframe_head(payload: &Bytes) -> Option<(u16, u16)> {
    let mut depacketizer = Vp8Packet::default();
    if !depacketizer.is_partition_head(payload) {
        return None;
    }
    let frame = depacketizer.depacketize(payload).ok()?;
    vp8::keyframe_size(&frame)
}

async fn record_slices(
    mut media_rx: broadcast::Receiver<MediaPacket>,
    mut writers: TrackWriters,
    slice_interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + slice_interval, slice_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,

            _ = ticker.tick() => {
                let sealed = writers.seal();
                if sealed > 0 {
                    debug!("Sealed {} recording slice(s)", sealed);
                }
            }

            media = media_rx.recv() => match media {
                Ok(media) => writers.write(&media),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Recorder lagged, {} packet(s) lost", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Remote stream ended during recording");
                    break;
                }
            },
        }
    }

    // Packets already published when the stop signal won the race.
    loop {
        match media_rx.try_recv() {
            Ok(media) => writers.write(&media),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    writers.close();
}

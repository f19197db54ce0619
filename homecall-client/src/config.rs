use homecall_core::IceServerConfig;
use std::time::Duration;

/// What to do with an offer that arrives after negotiation has already begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfferPolicy {
    /// Drop it and report [`crate::SessionError::RenegotiationUnsupported`].
    #[default]
    Reject,
    /// Drop it quietly.
    Ignore,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub offer_policy: OfferPolicy,
    /// Operator only: start negotiating as soon as the guest reports `user-started-session`.
    pub auto_start: bool,
    /// Replaced by whatever the relay sends in `ice-config`.
    pub ice_servers: Vec<IceServerConfig>,
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            offer_policy: OfferPolicy::default(),
            auto_start: true,
            ice_servers: IceServerConfig::default_stun(),
            event_buffer: 128,
        }
    }
}

/// Bounded reconnect attempts with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

/// Transport knobs for [`crate::WebRtcNegotiator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcOptions {
    /// Gather loopback host candidates, for calls between two peers on one machine.
    pub loopback_candidates: bool,
    /// Operator only: how often the guest is asked for a fresh keyframe. Zero disables it.
    pub keyframe_interval: Duration,
    /// Complete frames waiting for the decoder. Newer frames are dropped while it is full.
    pub decode_queue: usize,
}

impl Default for RtcOptions {
    fn default() -> Self {
        Self {
            loopback_candidates: false,
            keyframe_interval: Duration::from_secs(3),
            decode_queue: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Screenshot scale factor applied to each source dimension.
    pub upscale: u32,
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
    pub contrast: f32,
    pub slice_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            upscale: 4,
            sharpen_sigma: 1.2,
            sharpen_threshold: 2,
            contrast: 8.0,
            slice_interval: Duration::from_secs(1),
        }
    }
}

//! Frame classifier boundary.
//!
//! The [`FrameClassifier`] trait is the extensibility point: the engine
//! consumes per-frame activity decisions without knowing the acoustic
//! algorithm behind them. [`EnergyClassifier`] is the built-in default;
//! the `webrtc-classifier` feature adds a GMM backend.

pub mod energy;

#[cfg(feature = "webrtc-classifier")]
pub mod webrtc;

#[cfg(feature = "webrtc-classifier")]
pub use webrtc::WebRtcClassifier;

pub use energy::EnergyClassifier;

use crate::error::Result;

/// Sample rates the classifier table accepts, in Hz.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [8000, 16000, 32000, 48000];

/// Whether a single frame holds speech activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Activity above the classifier's working point.
    Active,
    /// Background / silence.
    Inactive,
}

impl FrameDecision {
    pub fn is_active(self) -> bool {
        self == FrameDecision::Active
    }
}

/// Accepted frame durations. Classifiers in this family operate on 10,
/// 20 or 30 ms of audio per decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDuration {
    Ms10,
    Ms20,
    Ms30,
}

impl FrameDuration {
    pub fn millis(self) -> u32 {
        match self {
            FrameDuration::Ms10 => 10,
            FrameDuration::Ms20 => 20,
            FrameDuration::Ms30 => 30,
        }
    }

    /// Samples per frame at the given rate (exact for all supported
    /// rates, which are multiples of 1000 Hz).
    pub fn samples_at(self, sample_rate: u32) -> usize {
        (sample_rate / 1000) as usize * self.millis() as usize
    }

    /// # Errors
    /// `InvalidArgument` for anything but 10, 20 or 30.
    pub fn try_from_millis(ms: u32) -> Result<Self> {
        match ms {
            10 => Ok(FrameDuration::Ms10),
            20 => Ok(FrameDuration::Ms20),
            30 => Ok(FrameDuration::Ms30),
            other => Err(crate::error::VoiceGateError::InvalidArgument(format!(
                "frame duration must be 10, 20 or 30 ms, got {other}"
            ))),
        }
    }
}

impl Default for FrameDuration {
    fn default() -> Self {
        FrameDuration::Ms20
    }
}

/// True when `samples` is exactly one accepted frame duration at `rate`.
pub fn valid_frame_length(sample_rate: u32, samples: usize) -> bool {
    [FrameDuration::Ms10, FrameDuration::Ms20, FrameDuration::Ms30]
        .iter()
        .any(|d| d.samples_at(sample_rate) == samples)
}

/// Contract for per-frame activity classifiers.
///
/// Implementors may be stateful (hangover counters, model hidden state)
/// and may hold thread-affine native resources; there is deliberately no
/// `Send` bound, so hosts construct the engine on the thread that drives
/// it.
pub trait FrameClassifier {
    /// Label one frame of linear PCM samples. The frame length is
    /// validated by the caller against the configured rate.
    fn classify(&mut self, frame: &[i16]) -> FrameDecision;

    /// Select the sensitivity mode.
    ///
    /// # Errors
    /// `InvalidMode` for values outside the implementation's range
    /// (0–3 for the provided backends; higher modes reject more audio as
    /// silence).
    fn set_mode(&mut self, mode: u8) -> Result<()>;

    /// Clear internal smoothing state, e.g. between independent streams.
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_frame_match_rate_table() {
        assert_eq!(FrameDuration::Ms10.samples_at(8000), 80);
        assert_eq!(FrameDuration::Ms20.samples_at(16000), 320);
        assert_eq!(FrameDuration::Ms30.samples_at(32000), 960);
        assert_eq!(FrameDuration::Ms30.samples_at(48000), 1440);
    }

    #[test]
    fn duration_parses_only_the_three_accepted_values() {
        assert_eq!(FrameDuration::try_from_millis(10).unwrap(), FrameDuration::Ms10);
        assert_eq!(FrameDuration::try_from_millis(20).unwrap(), FrameDuration::Ms20);
        assert_eq!(FrameDuration::try_from_millis(30).unwrap(), FrameDuration::Ms30);
        assert!(FrameDuration::try_from_millis(0).is_err());
        assert!(FrameDuration::try_from_millis(25).is_err());
    }

    #[test]
    fn frame_length_table() {
        // 16 kHz: 160 / 320 / 480 samples are valid, everything else not.
        assert!(valid_frame_length(16000, 160));
        assert!(valid_frame_length(16000, 320));
        assert!(valid_frame_length(16000, 480));
        assert!(!valid_frame_length(16000, 0));
        assert!(!valid_frame_length(16000, 319));
        assert!(!valid_frame_length(16000, 640));

        assert!(valid_frame_length(8000, 240));
        assert!(!valid_frame_length(48000, 240));
    }
}

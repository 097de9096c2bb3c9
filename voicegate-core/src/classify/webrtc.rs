//! WebRTC VAD backend (GMM-based) behind the `webrtc-classifier`
//! feature.
//!
//! Wraps [`webrtc_vad::Vad`], which only accepts the 8/16/32/48 kHz
//! rates and 10/20/30 ms frame lengths this crate already enforces.
//! The underlying instance is not `Send`; construct it on the thread
//! that drives classification.

use tracing::warn;
use webrtc_vad::{SampleRate, Vad, VadMode};

use super::{FrameClassifier, FrameDecision};
use crate::error::{Result, VoiceGateError};

fn sample_rate_of(rate: u32) -> Result<SampleRate> {
    match rate {
        8000 => Ok(SampleRate::Rate8kHz),
        16000 => Ok(SampleRate::Rate16kHz),
        32000 => Ok(SampleRate::Rate32kHz),
        48000 => Ok(SampleRate::Rate48kHz),
        other => Err(VoiceGateError::UnsupportedRate(other)),
    }
}

fn vad_mode_of(mode: u8) -> Result<VadMode> {
    match mode {
        0 => Ok(VadMode::Quality),
        1 => Ok(VadMode::LowBitrate),
        2 => Ok(VadMode::Aggressive),
        3 => Ok(VadMode::VeryAggressive),
        other => Err(VoiceGateError::InvalidMode(other)),
    }
}

/// Frame classifier backed by the WebRTC voice activity detector.
///
/// The configured rate and mode are kept as plain integers because
/// `reset` rebuilds the native instance from them (`Vad::reset` alone
/// would fall back to the crate's built-in 8 kHz default).
///
/// The detector is bound to its construction rate. An engine switching
/// sample rates needs a freshly constructed adapter; frames at any
/// other rate are rejected by the backend and classified inactive.
pub struct WebRtcClassifier {
    vad: Vad,
    rate: u32,
    mode: u8,
}

impl WebRtcClassifier {
    /// Create a detector for the given sample rate and aggressiveness
    /// mode (0 = most permissive, 3 = most aggressive).
    ///
    /// # Errors
    /// `UnsupportedRate` or `InvalidMode` when either is outside the
    /// WebRTC-supported set.
    pub fn new(sample_rate: u32, mode: u8) -> Result<Self> {
        let rate = sample_rate_of(sample_rate)?;
        let vad_mode = vad_mode_of(mode)?;
        Ok(Self {
            vad: Vad::new_with_rate_and_mode(rate, vad_mode),
            rate: sample_rate,
            mode,
        })
    }
}

impl std::fmt::Debug for WebRtcClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // webrtc_vad::Vad implements neither Debug nor PartialEq.
        f.debug_struct("WebRtcClassifier")
            .field("rate", &self.rate)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl FrameClassifier for WebRtcClassifier {
    fn classify(&mut self, frame: &[i16]) -> FrameDecision {
        match self.vad.is_voice_segment(frame) {
            Ok(true) => FrameDecision::Active,
            Ok(false) => FrameDecision::Inactive,
            Err(()) => {
                // Only cause is a frame length the rate doesn't allow.
                warn!(samples = frame.len(), "webrtc vad rejected frame");
                FrameDecision::Inactive
            }
        }
    }

    fn set_mode(&mut self, mode: u8) -> Result<()> {
        self.vad.set_mode(vad_mode_of(mode)?);
        self.mode = mode;
        Ok(())
    }

    fn reset(&mut self) {
        // Both conversions were validated when the values were stored.
        if let (Ok(rate), Ok(mode)) = (sample_rate_of(self.rate), vad_mode_of(self.mode)) {
            self.vad = Vad::new_with_rate_and_mode(rate, mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_rate() {
        assert!(matches!(
            WebRtcClassifier::new(44100, 1),
            Err(VoiceGateError::UnsupportedRate(44100))
        ));
    }

    #[test]
    fn rejects_invalid_mode() {
        assert!(matches!(
            WebRtcClassifier::new(16000, 4),
            Err(VoiceGateError::InvalidMode(4))
        ));
    }

    #[test]
    fn silence_frame_is_inactive() {
        let mut c = WebRtcClassifier::new(16000, 3).unwrap();
        // 20 ms of digital silence at 16 kHz.
        let frame = vec![0i16; 320];
        assert_eq!(c.classify(&frame), FrameDecision::Inactive);
    }

    #[test]
    fn wrong_frame_length_is_inactive_not_fatal() {
        let mut c = WebRtcClassifier::new(16000, 1).unwrap();
        let odd = vec![0i16; 123];
        assert_eq!(c.classify(&odd), FrameDecision::Inactive);
        // Still usable with a legal frame afterwards.
        let frame = vec![0i16; 320];
        assert_eq!(c.classify(&frame), FrameDecision::Inactive);
    }

    #[test]
    fn reset_restores_rate_and_mode() {
        let mut c = WebRtcClassifier::new(32000, 2).unwrap();
        c.reset();
        // After reset the instance must still accept 32 kHz frames
        // (Vad::reset alone would have dropped it back to 8 kHz).
        let frame = vec![0i16; 640]; // 20 ms @ 32 kHz
        assert_eq!(c.classify(&frame), FrameDecision::Inactive);
    }
}

//! Energy-based frame classifier: RMS threshold + hangover counter.
//!
//! ## Algorithm
//!
//! 1. Compute the RMS of the frame, normalized to full scale [0, 1].
//! 2. If RMS ≥ the mode's threshold → `Active`, reload the hangover
//!    counter.
//! 3. If below threshold while the hangover counter is positive →
//!    `Active`, decrement (prevents clipping syllable endings).
//! 4. Otherwise → `Inactive`.
//!
//! Modes 0–3 trade sensitivity for noise rejection: mode 0 admits quiet
//! speech, mode 3 demands sustained energy.

use super::{FrameClassifier, FrameDecision};
use crate::error::{Result, VoiceGateError};

/// Per-mode RMS thresholds on normalized full scale.
const MODE_THRESHOLDS: [f32; 4] = [0.010, 0.018, 0.028, 0.042];

/// Per-mode hangover lengths in frames. Stricter modes also release
/// faster.
const MODE_HANGOVER: [u32; 4] = [8, 6, 4, 2];

/// A simple energy-based activity classifier.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    mode: u8,
    threshold: f32,
    hangover_frames: u32,
    /// Current hangover countdown.
    hangover_counter: u32,
}

impl EnergyClassifier {
    /// Create a classifier in the given sensitivity mode (0–3).
    ///
    /// # Errors
    /// `InvalidMode` outside that range.
    pub fn new(mode: u8) -> Result<Self> {
        let mut classifier = Self {
            mode: 0,
            threshold: MODE_THRESHOLDS[0],
            hangover_frames: MODE_HANGOVER[0],
            hangover_counter: 0,
        };
        classifier.set_mode(mode)?;
        Ok(classifier)
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Root-mean-square of a frame, normalized so i16 full scale maps
    /// to 1.0.
    fn rms(frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = frame
            .iter()
            .map(|&s| {
                let x = f64::from(s) / 32768.0;
                x * x
            })
            .sum();
        (sum_sq / frame.len() as f64).sqrt() as f32
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self {
            mode: 1,
            threshold: MODE_THRESHOLDS[1],
            hangover_frames: MODE_HANGOVER[1],
            hangover_counter: 0,
        }
    }
}

impl FrameClassifier for EnergyClassifier {
    fn classify(&mut self, frame: &[i16]) -> FrameDecision {
        let rms = Self::rms(frame);

        if rms >= self.threshold {
            // Real activity, reload the hangover window
            self.hangover_counter = self.hangover_frames;
            FrameDecision::Active
        } else if self.hangover_counter > 0 {
            self.hangover_counter -= 1;
            FrameDecision::Active
        } else {
            FrameDecision::Inactive
        }
    }

    fn set_mode(&mut self, mode: u8) -> Result<()> {
        let idx = usize::from(mode);
        if idx >= MODE_THRESHOLDS.len() {
            return Err(VoiceGateError::InvalidMode(mode));
        }
        self.mode = mode;
        self.threshold = MODE_THRESHOLDS[idx];
        self.hangover_frames = MODE_HANGOVER[idx];
        // A hangover granted under the previous mode must not outlive
        // the new, possibly shorter, window.
        self.hangover_counter = self.hangover_counter.min(self.hangover_frames);
        Ok(())
    }

    fn reset(&mut self) {
        self.hangover_counter = 0;
    }
}

//! Speech segmentation: turning per-frame activity decisions into
//! segment boundaries.
//!
//! ## State machine
//!
//! ```text
//!          ≥ speech_threshold consecutive active frames
//!   Idle ───────────────────────────────────────────────▶ InSpeech
//!     ▲                                                      │
//!     └──────────────────────────────────────────────────────┘
//!          ≥ silence_threshold consecutive inactive frames
//! ```
//!
//! Both counters demand *consecutive* frames; a single opposing frame
//! resets the run, which is what keeps clicks from opening segments
//! and short pauses from closing them.
//!
//! On the Idle→InSpeech transition the emitted [`SegmentEvent::SpeechStart`]
//! carries retained lead-in audio (from a [`PreRollBuffer`]) followed by
//! the onset frames that satisfied the threshold, so the consumer never
//! loses the softly-spoken first syllables.

pub mod collector;
pub mod events;

pub use collector::{channel_callback, SegmentCollector, Utterance};
pub use events::{FeedStatus, SegmentEvent};

use crate::buffering::PreRollBuffer;
use crate::error::{Result, VoiceGateError};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InSpeech,
}

/// Hysteresis state machine over per-frame activity decisions.
///
/// Owns no audio source and no classifier; callers hand it one
/// decision and one frame at a time, plus the pre-roll buffer to
/// draw lead-in from when a segment opens.
#[derive(Debug)]
pub struct SpeechSegmenter {
    state: State,
    /// Consecutive active frames required to open a segment.
    speech_threshold: usize,
    /// Consecutive inactive frames required to close a segment.
    silence_threshold: usize,
    /// Most lead-in bytes to prepend when a segment opens.
    lead_in_bytes: usize,
    active_run: usize,
    silence_run: usize,
    /// Frames of the active run not yet confirmed as a segment.
    onset: Vec<u8>,
    /// Assembled lead-in + onset, alive until the next frame.
    payload: Vec<u8>,
}

impl SpeechSegmenter {
    /// # Errors
    /// `InvalidArgument` when either threshold is zero; a zero
    /// threshold would open (or close) on no evidence at all.
    pub fn new(
        speech_threshold: usize,
        silence_threshold: usize,
        lead_in_bytes: usize,
    ) -> Result<Self> {
        if speech_threshold == 0 {
            return Err(VoiceGateError::InvalidArgument(
                "speech threshold must be at least one frame".into(),
            ));
        }
        if silence_threshold == 0 {
            return Err(VoiceGateError::InvalidArgument(
                "silence threshold must be at least one frame".into(),
            ));
        }
        Ok(Self {
            state: State::Idle,
            speech_threshold,
            silence_threshold,
            lead_in_bytes,
            active_run: 0,
            silence_run: 0,
            onset: Vec::new(),
            payload: Vec::new(),
        })
    }

    /// Advance the state machine by one classified frame.
    ///
    /// `frame` is the raw audio the decision was made on; `preroll`
    /// holds recent history for lead-in assembly. Returns `None` while
    /// idle without a boundary, otherwise the event for this frame.
    pub fn process_frame<'a>(
        &'a mut self,
        active: bool,
        frame: &'a [u8],
        preroll: &mut PreRollBuffer,
    ) -> Option<SegmentEvent<'a>> {
        match (self.state, active) {
            (State::Idle, true) => {
                self.silence_run = 0;
                self.active_run += 1;
                self.onset.extend_from_slice(frame);
                if self.active_run < self.speech_threshold {
                    trace!(run = self.active_run, "candidate speech frame");
                    return None;
                }
                self.active_run = 0;
                self.assemble_start_payload(preroll);
                self.state = State::InSpeech;
                debug!(payload_bytes = self.payload.len(), "segment opened");
                Some(SegmentEvent::SpeechStart {
                    audio: &self.payload,
                })
            }
            (State::Idle, false) => {
                // One inactive frame voids the whole candidate run.
                self.active_run = 0;
                self.onset.clear();
                None
            }
            (State::InSpeech, true) => {
                self.silence_run = 0;
                Some(SegmentEvent::SpeechContinuing { audio: frame })
            }
            (State::InSpeech, false) => {
                self.silence_run += 1;
                if self.silence_run < self.silence_threshold {
                    // Trailing audio stays part of the segment until
                    // the silence is confirmed.
                    return Some(SegmentEvent::SpeechContinuing { audio: frame });
                }
                self.silence_run = 0;
                self.state = State::Idle;
                debug!("segment closed");
                Some(SegmentEvent::SilenceConfirmed { audio: frame })
            }
        }
    }

    /// Build `payload` = lead-in ++ onset when a segment opens.
    ///
    /// The pre-roll ring holds every frame fed so far, onset frames
    /// included; the lead-in is whatever precedes the onset, capped at
    /// `lead_in_bytes` and at actual occupancy.
    fn assemble_start_payload(&mut self, preroll: &mut PreRollBuffer) {
        self.payload.clear();

        let past = preroll.len().saturating_sub(self.onset.len());
        let want = past.min(self.lead_in_bytes);
        preroll.drop_front(past - want);
        let copied = preroll.extract_lead_in(&mut self.payload, want);
        debug_assert_eq!(copied, want);

        self.payload.extend_from_slice(&self.onset);
        // The onset bytes still sitting in the ring are now part of
        // the payload; keeping them would replay them as lead-in.
        preroll.clear();
        self.onset.clear();
    }

    /// True while between `SpeechStart` and `SilenceConfirmed`.
    pub fn is_in_speech(&self) -> bool {
        self.state == State::InSpeech
    }

    pub fn speech_threshold(&self) -> usize {
        self.speech_threshold
    }

    pub fn silence_threshold(&self) -> usize {
        self.silence_threshold
    }

    /// # Errors
    /// `InvalidArgument` when `frames` is zero.
    pub fn set_speech_threshold(&mut self, frames: usize) -> Result<()> {
        if frames == 0 {
            return Err(VoiceGateError::InvalidArgument(
                "speech threshold must be at least one frame".into(),
            ));
        }
        self.speech_threshold = frames;
        Ok(())
    }

    /// # Errors
    /// `InvalidArgument` when `frames` is zero.
    pub fn set_silence_threshold(&mut self, frames: usize) -> Result<()> {
        if frames == 0 {
            return Err(VoiceGateError::InvalidArgument(
                "silence threshold must be at least one frame".into(),
            ));
        }
        self.silence_threshold = frames;
        Ok(())
    }

    pub fn set_lead_in_bytes(&mut self, bytes: usize) {
        self.lead_in_bytes = bytes;
    }

    /// Return to `Idle` and forget all run state and staged audio.
    /// Thresholds and the lead-in cap survive.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.active_run = 0;
        self.silence_run = 0;
        self.onset.clear();
        self.payload.clear();
    }
}

//! # voicegate-core
//!
//! Reusable speech segmentation engine SDK.
//!
//! ## Architecture
//!
//! ```text
//! feed(PCM bytes) → FrameAssembler → frame ─┬─► PreRollBuffer
//!                                           ├─► FrameClassifier (energy / webrtc)
//!                                           └─► SpeechSegmenter
//!                                                    │
//!                                         SegmentEvent → callback
//!                                                    │
//!                                      SegmentCollector → Utterance
//! ```
//!
//! The engine is synchronous: everything happens inside `feed()` on
//! the caller's thread. Live capture hosts push into a `SharedRing`
//! from the audio callback and drain it into the engine from one
//! consumer loop.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod classify;
pub mod engine;
pub mod error;
pub mod segment;

// Convenience re-exports for downstream crates
pub use audio::resample::RateConverter;
pub use audio::AudioCapture;
pub use buffering::SharedRing;
pub use classify::{EnergyClassifier, FrameClassifier, FrameDecision, FrameDuration};
pub use engine::{EngineConfig, EngineStats, VoiceGateEngine};
pub use error::VoiceGateError;
pub use segment::{
    channel_callback, FeedStatus, SegmentCollector, SegmentEvent, SpeechSegmenter, Utterance,
};

#[cfg(feature = "webrtc-classifier")]
pub use classify::WebRtcClassifier;

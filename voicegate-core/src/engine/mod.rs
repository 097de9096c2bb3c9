//! `VoiceGateEngine`, the top-level feed-driven segmentation engine.
//!
//! ## Data flow
//!
//! ```text
//! feed(bytes) ─► FrameAssembler ─► frame ─┬─► PreRollBuffer (history)
//!                                         ├─► FrameClassifier ─► active?
//!                                         └─► SpeechSegmenter ─► SegmentEvent ─► callback
//! ```
//!
//! The engine is synchronous and single-owner: every operation takes
//! `&mut self`, and all work happens inside the `feed()` /
//! `process_frame()` call on the caller's thread. Hosts that capture
//! audio on another thread hand chunks over via
//! [`crate::buffering::SharedRing`] and drive the engine from one
//! consumer loop.
//!
//! `feed()` accepts arbitrary chunk sizes and classifies whatever
//! whole frames are available, holding the remainder for the next
//! call. `process_frame()` bypasses assembly for callers that already
//! produce exact frames.

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    audio::pcm,
    buffering::{FrameAssembler, PreRollBuffer},
    classify::{
        valid_frame_length, EnergyClassifier, FrameClassifier, FrameDuration,
        SUPPORTED_SAMPLE_RATES,
    },
    error::{Result, VoiceGateError},
    segment::{FeedStatus, SegmentEvent, SpeechSegmenter},
};

/// Configuration for `VoiceGateEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Input sample rate (Hz). Must be 8000, 16000, 32000 or 48000.
    /// Default: 16000.
    pub sample_rate: u32,
    /// Frame length the assembler cuts the stream into.
    /// Default: 20 ms.
    pub frame_duration: FrameDuration,
    /// Classifier aggressiveness, 0 (permissive) to 3 (strict).
    /// Default: 1.
    pub mode: u8,
    /// Consecutive active frames required to open a segment.
    /// Default: 3 (60 ms at the default frame length).
    pub speech_threshold: usize,
    /// Consecutive inactive frames required to close a segment.
    /// Default: 15 (300 ms at the default frame length).
    pub silence_threshold: usize,
    /// Audio retained before segment onset (ms). Default: 300.
    pub lead_in_ms: u32,
    /// Largest chunk a single `feed()` call may carry. Bigger chunks
    /// are rejected without disturbing buffered audio. Default: 4096.
    pub max_chunk_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_duration: FrameDuration::Ms20,
            mode: 1,
            speech_threshold: 3,
            silence_threshold: 15,
            lead_in_ms: 300,
            max_chunk_bytes: 4096,
        }
    }
}

impl EngineConfig {
    /// Samples per assembled frame at the configured rate.
    pub fn frame_samples(&self) -> usize {
        self.frame_duration.samples_at(self.sample_rate)
    }

    /// Bytes per assembled frame (16-bit mono).
    pub fn frame_size_bytes(&self) -> usize {
        self.frame_samples() * 2
    }

    /// The lead-in window in bytes at the configured rate.
    pub fn lead_in_bytes(&self) -> usize {
        (self.sample_rate / 1000) as usize * self.lead_in_ms as usize * 2
    }

    /// # Errors
    /// `UnsupportedRate` / `InvalidArgument` for values the engine
    /// cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(VoiceGateError::UnsupportedRate(self.sample_rate));
        }
        if self.speech_threshold == 0 {
            return Err(VoiceGateError::InvalidArgument(
                "speech threshold must be at least one frame".into(),
            ));
        }
        if self.silence_threshold == 0 {
            return Err(VoiceGateError::InvalidArgument(
                "silence threshold must be at least one frame".into(),
            ));
        }
        Ok(())
    }

    /// Pre-roll ring capacity: the full lead-in window rounded up to
    /// whole frames, plus room for the onset run, and never smaller
    /// than the longest frame `process_frame` may feed directly.
    fn preroll_capacity(&self) -> usize {
        let frame = self.frame_size_bytes();
        let lead_in_frames = self.lead_in_bytes().div_ceil(frame);
        let base = (lead_in_frames + self.speech_threshold) * frame;
        base.max(FrameDuration::Ms30.samples_at(self.sample_rate) * 2)
    }
}

/// Cumulative counters, sampled with [`VoiceGateEngine::stats`].
///
/// Counters survive `reset()`; they describe the engine's whole
/// lifetime, not one utterance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Bytes accepted by `feed()` and `process_frame()`.
    pub bytes_fed: u64,
    /// Whole frames run through the classifier.
    pub frames_classified: u64,
    /// Frames the classifier judged active.
    pub active_frames: u64,
    pub segments_started: u64,
    pub segments_completed: u64,
}

/// Callback invoked for every segment boundary and in-speech frame.
pub type SegmentCallback = Box<dyn FnMut(SegmentEvent<'_>)>;

/// Feed-driven speech segmentation engine.
///
/// Not `Send` by design: classifier backends may be thread-affine, so
/// construct the engine on the thread that will drive it.
pub struct VoiceGateEngine {
    config: EngineConfig,
    classifier: Box<dyn FrameClassifier>,
    assembler: FrameAssembler,
    preroll: PreRollBuffer,
    segmenter: SpeechSegmenter,
    callback: Option<SegmentCallback>,
    /// Reused per-frame byte buffer.
    frame_scratch: Vec<u8>,
    /// Reused per-frame sample buffer for the classifier.
    sample_scratch: Vec<i16>,
    stats: EngineStats,
}

impl VoiceGateEngine {
    /// Create an engine with the built-in energy classifier in
    /// `config.mode`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let classifier = Box::new(EnergyClassifier::new(config.mode)?);
        Self::with_classifier(config, classifier)
    }

    /// Create an engine around a caller-supplied classifier backend.
    ///
    /// `config.mode` is not applied to the classifier here; the
    /// caller constructed it and owns its initial mode.
    pub fn with_classifier(
        config: EngineConfig,
        classifier: Box<dyn FrameClassifier>,
    ) -> Result<Self> {
        config.validate()?;
        let frame_size = config.frame_size_bytes();
        let assembler = FrameAssembler::new(frame_size, config.max_chunk_bytes)?;
        let preroll = PreRollBuffer::new(config.preroll_capacity(), config.lead_in_bytes())?;
        let segmenter = SpeechSegmenter::new(
            config.speech_threshold,
            config.silence_threshold,
            config.lead_in_bytes(),
        )?;

        info!(
            sample_rate = config.sample_rate,
            frame_ms = config.frame_duration.millis(),
            speech_threshold = config.speech_threshold,
            silence_threshold = config.silence_threshold,
            "engine ready"
        );

        Ok(Self {
            config,
            classifier,
            assembler,
            preroll,
            segmenter,
            callback: None,
            frame_scratch: vec![0u8; frame_size],
            sample_scratch: Vec::with_capacity(frame_size / 2),
            stats: EngineStats::default(),
        })
    }

    /// Feed a chunk of little-endian i16 mono PCM.
    ///
    /// Classifies every whole frame that becomes available and buffers
    /// the remainder. Returns the status of the last frame boundary
    /// crossed, or `Pending` when no event fired.
    ///
    /// # Errors
    /// `BufferOverrun` when the chunk exceeds the configured maximum;
    /// buffered audio is left untouched and smaller chunks still work.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<FeedStatus> {
        self.assembler.feed(chunk)?;
        self.stats.bytes_fed += chunk.len() as u64;

        let frame_size = self.assembler.frame_size();
        self.frame_scratch.resize(frame_size, 0);

        let mut last = FeedStatus::Pending;
        while self.assembler.pop_frame(&mut self.frame_scratch) {
            self.preroll.feed(&self.frame_scratch)?;
            pcm::bytes_to_samples(&self.frame_scratch, &mut self.sample_scratch);

            let decision = self.classifier.classify(&self.sample_scratch);
            self.stats.frames_classified += 1;
            if decision.is_active() {
                self.stats.active_frames += 1;
            }

            let event = self.segmenter.process_frame(
                decision.is_active(),
                &self.frame_scratch,
                &mut self.preroll,
            );
            if let Some(event) = event {
                last = Self::dispatch(&mut self.stats, &mut self.callback, event);
            }
        }
        Ok(last)
    }

    /// Classify one already-assembled frame of i16 samples, bypassing
    /// the chunk assembler.
    ///
    /// # Errors
    /// `InvalidFrameLength` when `frame` is not 10, 20 or 30 ms at the
    /// configured rate; the frame is not classified.
    pub fn process_frame(&mut self, frame: &[i16]) -> Result<FeedStatus> {
        if !valid_frame_length(self.config.sample_rate, frame.len()) {
            return Err(VoiceGateError::InvalidFrameLength {
                samples: frame.len(),
                sample_rate: self.config.sample_rate,
            });
        }

        pcm::samples_to_bytes(frame, &mut self.frame_scratch);
        self.preroll.feed(&self.frame_scratch)?;
        self.stats.bytes_fed += self.frame_scratch.len() as u64;

        let decision = self.classifier.classify(frame);
        self.stats.frames_classified += 1;
        if decision.is_active() {
            self.stats.active_frames += 1;
        }

        let event = self.segmenter.process_frame(
            decision.is_active(),
            &self.frame_scratch,
            &mut self.preroll,
        );
        match event {
            Some(event) => Ok(Self::dispatch(&mut self.stats, &mut self.callback, event)),
            None => Ok(FeedStatus::Pending),
        }
    }

    /// Count the event and hand it to the registered callback.
    fn dispatch(
        stats: &mut EngineStats,
        callback: &mut Option<SegmentCallback>,
        event: SegmentEvent<'_>,
    ) -> FeedStatus {
        let status = event.status();
        match status {
            FeedStatus::SpeechStart => stats.segments_started += 1,
            FeedStatus::SilenceConfirmed => stats.segments_completed += 1,
            FeedStatus::SpeechContinuing | FeedStatus::Pending => {}
        }
        if let Some(callback) = callback.as_mut() {
            callback(event);
        }
        status
    }

    /// Register the segment event callback, replacing any previous one.
    pub fn register_callback(&mut self, callback: impl FnMut(SegmentEvent<'_>) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Swap the classifier backend. Stream state is untouched; call
    /// [`reset`](Self::reset) as well when switching mid-stream.
    pub fn set_classifier(&mut self, classifier: Box<dyn FrameClassifier>) {
        self.classifier = classifier;
    }

    /// Forward a new aggressiveness mode to the classifier.
    ///
    /// # Errors
    /// `InvalidMode` from the backend; the previous mode stays active.
    pub fn set_mode(&mut self, mode: u8) -> Result<()> {
        self.classifier.set_mode(mode)?;
        self.config.mode = mode;
        Ok(())
    }

    /// Change the input sample rate.
    ///
    /// Rebuilds the frame assembler and pre-roll window and drops any
    /// buffered audio, since samples at the old rate are meaningless at the
    /// new one. Classifier backends bound to a fixed rate must be
    /// replaced separately via [`set_classifier`](Self::set_classifier).
    ///
    /// # Errors
    /// `UnsupportedRate` when the rate is not in the supported set;
    /// the engine keeps running at the old rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        let mut next = self.config.clone();
        next.sample_rate = sample_rate;
        next.validate()?;

        let frame_size = next.frame_size_bytes();
        let assembler = FrameAssembler::new(frame_size, next.max_chunk_bytes)?;
        let preroll = PreRollBuffer::new(next.preroll_capacity(), next.lead_in_bytes())?;

        self.assembler = assembler;
        self.preroll = preroll;
        self.segmenter.set_lead_in_bytes(next.lead_in_bytes());
        self.segmenter.reset();
        self.classifier.reset();
        self.config = next;
        debug!(sample_rate, frame_bytes = frame_size, "sample rate changed");
        Ok(())
    }

    /// Set how many consecutive active frames open a segment.
    ///
    /// Resizes the pre-roll window, discarding retained lead-in.
    ///
    /// # Errors
    /// `InvalidArgument` when `frames` is zero.
    pub fn set_speech_threshold(&mut self, frames: usize) -> Result<()> {
        let mut next = self.config.clone();
        next.speech_threshold = frames;
        next.validate()?;

        let preroll = PreRollBuffer::new(next.preroll_capacity(), next.lead_in_bytes())?;
        self.segmenter.set_speech_threshold(frames)?;
        self.preroll = preroll;
        self.config = next;
        Ok(())
    }

    /// Set how many consecutive inactive frames close a segment.
    ///
    /// # Errors
    /// `InvalidArgument` when `frames` is zero.
    pub fn set_silence_threshold(&mut self, frames: usize) -> Result<()> {
        self.segmenter.set_silence_threshold(frames)?;
        self.config.silence_threshold = frames;
        Ok(())
    }

    /// Resize the lead-in window, discarding retained lead-in.
    pub fn set_lead_in_ms(&mut self, lead_in_ms: u32) -> Result<()> {
        let mut next = self.config.clone();
        next.lead_in_ms = lead_in_ms;

        let preroll = PreRollBuffer::new(next.preroll_capacity(), next.lead_in_bytes())?;
        self.segmenter.set_lead_in_bytes(next.lead_in_bytes());
        self.preroll = preroll;
        self.config = next;
        Ok(())
    }

    /// Drop all buffered audio and return to idle.
    ///
    /// Configuration, the registered callback and [`stats`](Self::stats)
    /// survive; partial frames, retained lead-in, run counters and
    /// classifier state do not.
    pub fn reset(&mut self) {
        self.assembler.clear();
        self.preroll.clear();
        self.segmenter.reset();
        self.classifier.reset();
        debug!("engine reset");
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn frame_size_bytes(&self) -> usize {
        self.assembler.frame_size()
    }

    /// Bytes sitting in the assembler waiting for a frame boundary.
    pub fn buffered_bytes(&self) -> usize {
        self.assembler.buffered_len()
    }

    /// True while between `SpeechStart` and `SilenceConfirmed`.
    pub fn is_in_speech(&self) -> bool {
        self.segmenter.is_in_speech()
    }
}

//! Collecting per-frame segment events into whole utterances.
//!
//! The engine's callback surface hands out borrowed, frame-sized
//! events; most consumers want the opposite, one owned buffer per
//! utterance. [`SegmentCollector`] does that accumulation, and
//! [`channel_callback`] packages it as a ready-made callback that
//! ships finished utterances over a channel.

use std::collections::VecDeque;

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, warn};

use super::events::SegmentEvent;

/// One complete speech segment: lead-in, speech, and trailing audio up
/// to the confirming silence, as little-endian i16 PCM bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub audio: Vec<u8>,
}

impl Utterance {
    /// Duration of the payload at the given sample rate, assuming
    /// 16-bit mono samples.
    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            return 0;
        }
        let samples = (self.audio.len() / 2) as u64;
        samples * 1000 / u64::from(sample_rate)
    }
}

/// Accumulates segment events into finished [`Utterance`]s.
#[derive(Debug, Default)]
pub struct SegmentCollector {
    current: Option<Vec<u8>>,
    finished: VecDeque<Utterance>,
}

impl SegmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the collector.
    pub fn observe(&mut self, event: SegmentEvent<'_>) {
        match event {
            SegmentEvent::SpeechStart { audio } => {
                if let Some(orphan) = self.current.take() {
                    // A start without a preceding close; keep what we
                    // had rather than losing it.
                    debug!(bytes = orphan.len(), "closing orphaned segment");
                    self.finished.push_back(Utterance { audio: orphan });
                }
                self.current = Some(audio.to_vec());
            }
            SegmentEvent::SpeechContinuing { audio } => {
                if let Some(current) = self.current.as_mut() {
                    current.extend_from_slice(audio);
                }
            }
            SegmentEvent::SilenceConfirmed { audio } => {
                if let Some(mut current) = self.current.take() {
                    current.extend_from_slice(audio);
                    self.finished.push_back(Utterance { audio: current });
                }
            }
        }
    }

    /// True between a `SpeechStart` and its `SilenceConfirmed`.
    pub fn in_segment(&self) -> bool {
        self.current.is_some()
    }

    /// Oldest finished utterance, if any.
    pub fn pop_finished(&mut self) -> Option<Utterance> {
        self.finished.pop_front()
    }

    /// Close a still-open segment, e.g. when the input stream ends
    /// before the silence that would have confirmed it.
    pub fn finish_pending(&mut self) -> Option<Utterance> {
        self.current.take().map(|audio| Utterance { audio })
    }
}

/// A callback that collects events and ships each finished utterance
/// over `tx`. A full or disconnected channel drops the utterance with
/// a warning instead of blocking the feed path.
pub fn channel_callback(tx: Sender<Utterance>) -> impl FnMut(SegmentEvent<'_>) {
    let mut collector = SegmentCollector::new();
    move |event| {
        collector.observe(event);
        while let Some(utterance) = collector.pop_finished() {
            match tx.try_send(utterance) {
                Ok(()) => {}
                Err(TrySendError::Full(utterance)) => {
                    warn!(bytes = utterance.audio.len(), "utterance channel full, dropping");
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!("utterance channel disconnected");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn collects_one_utterance_across_events() {
        let mut collector = SegmentCollector::new();
        collector.observe(SegmentEvent::SpeechStart { audio: &[1, 1] });
        assert!(collector.in_segment());
        collector.observe(SegmentEvent::SpeechContinuing { audio: &[2, 2] });
        collector.observe(SegmentEvent::SilenceConfirmed { audio: &[3, 3] });
        assert!(!collector.in_segment());

        let utterance = collector.pop_finished().unwrap();
        assert_eq!(utterance.audio, vec![1, 1, 2, 2, 3, 3]);
        assert!(collector.pop_finished().is_none());
    }

    #[test]
    fn events_without_open_segment_are_ignored() {
        let mut collector = SegmentCollector::new();
        collector.observe(SegmentEvent::SpeechContinuing { audio: &[9] });
        collector.observe(SegmentEvent::SilenceConfirmed { audio: &[9] });
        assert!(collector.pop_finished().is_none());
        assert!(!collector.in_segment());
    }

    #[test]
    fn start_while_open_preserves_both_segments() {
        let mut collector = SegmentCollector::new();
        collector.observe(SegmentEvent::SpeechStart { audio: &[1] });
        collector.observe(SegmentEvent::SpeechStart { audio: &[2] });
        collector.observe(SegmentEvent::SilenceConfirmed { audio: &[3] });

        assert_eq!(collector.pop_finished().unwrap().audio, vec![1]);
        assert_eq!(collector.pop_finished().unwrap().audio, vec![2, 3]);
    }

    #[test]
    fn finish_pending_flushes_open_segment() {
        let mut collector = SegmentCollector::new();
        collector.observe(SegmentEvent::SpeechStart { audio: &[5, 5] });
        collector.observe(SegmentEvent::SpeechContinuing { audio: &[6, 6] });

        let utterance = collector.finish_pending().unwrap();
        assert_eq!(utterance.audio, vec![5, 5, 6, 6]);
        assert!(collector.finish_pending().is_none());
    }

    #[test]
    fn duration_reflects_sample_count() {
        let utterance = Utterance {
            // 320 samples at 16 kHz = 20 ms.
            audio: vec![0; 640],
        };
        assert_eq!(utterance.duration_ms(16000), 20);
        assert_eq!(utterance.duration_ms(0), 0);
    }

    #[test]
    fn channel_callback_ships_finished_utterances() {
        let (tx, rx) = bounded(4);
        let mut callback = channel_callback(tx);

        callback(SegmentEvent::SpeechStart { audio: &[1] });
        assert!(rx.try_recv().is_err());
        callback(SegmentEvent::SilenceConfirmed { audio: &[2] });

        let utterance = rx.try_recv().unwrap();
        assert_eq!(utterance.audio, vec![1, 2]);
    }

    #[test]
    fn full_channel_drops_without_blocking() {
        let (tx, rx) = bounded(1);
        let mut callback = channel_callback(tx);

        for tag in 0..3u8 {
            callback(SegmentEvent::SpeechStart { audio: &[tag] });
            callback(SegmentEvent::SilenceConfirmed { audio: &[tag] });
        }

        // Only the first fit; the rest were dropped, not queued.
        assert_eq!(rx.try_recv().unwrap().audio, vec![0, 0]);
        assert!(rx.try_recv().is_err());
    }
}

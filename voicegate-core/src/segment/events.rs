//! Events emitted by the segmenter as frames are classified.

use serde::{Deserialize, Serialize};

/// Summary of what the most recent feed produced, after the last
/// fully-assembled frame was classified.
///
/// Serialized in snake_case for log records and IPC payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    /// No frame boundary was crossed, or no state change occurred.
    Pending,
    /// Enough consecutive active frames: a segment just opened.
    SpeechStart,
    /// Inside an open segment.
    SpeechContinuing,
    /// Enough consecutive inactive frames: the segment just closed.
    SilenceConfirmed,
}

/// A per-frame segmentation event, borrowing the audio it refers to.
///
/// `SpeechStart` carries the retained lead-in plus the onset frames
/// that triggered the segment; the other variants carry exactly the
/// frame that produced them. Copy the bytes out before the next feed
/// if they need to outlive the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEvent<'a> {
    SpeechStart { audio: &'a [u8] },
    SpeechContinuing { audio: &'a [u8] },
    SilenceConfirmed { audio: &'a [u8] },
}

impl<'a> SegmentEvent<'a> {
    /// The audio payload this event refers to.
    pub fn audio(&self) -> &'a [u8] {
        match self {
            SegmentEvent::SpeechStart { audio }
            | SegmentEvent::SpeechContinuing { audio }
            | SegmentEvent::SilenceConfirmed { audio } => audio,
        }
    }

    /// The status tag corresponding to this event.
    pub fn status(&self) -> FeedStatus {
        match self {
            SegmentEvent::SpeechStart { .. } => FeedStatus::SpeechStart,
            SegmentEvent::SpeechContinuing { .. } => FeedStatus::SpeechContinuing,
            SegmentEvent::SilenceConfirmed { .. } => FeedStatus::SilenceConfirmed,
        }
    }
}

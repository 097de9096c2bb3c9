//! Sliding-window retention of recent audio for segment lead-in.
//!
//! Unlike the frame queue, this buffer treats overflow as policy, not
//! failure: when a chunk does not fit, the oldest bytes are evicted to
//! admit it. At any moment it holds the most recent ≤ capacity bytes fed
//! to it.

use tracing::debug;

use super::ring::RingBuffer;
use crate::error::{Result, VoiceGateError};

#[derive(Debug)]
pub struct PreRollBuffer {
    ring: RingBuffer,
    /// Upper bound on how much lead-in a single extraction may hand out.
    max_lead_in: usize,
}

impl PreRollBuffer {
    pub fn new(capacity: usize, max_lead_in: usize) -> Result<Self> {
        Ok(Self {
            ring: RingBuffer::new(capacity)?,
            max_lead_in,
        })
    }

    /// Retain a chunk, evicting the oldest bytes if needed.
    ///
    /// Eviction removes exactly `chunk.len()` bytes, then the push is
    /// retried once. A second failure means the chunk exceeds the buffer's
    /// capacity outright, which is a sizing defect.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        match self.ring.push(chunk) {
            Ok(()) => return Ok(()),
            Err(VoiceGateError::InsufficientSpace { .. }) => {}
            Err(other) => return Err(other),
        }

        let evicted = self.ring.drop_front(chunk.len());
        debug!(evicted, chunk = chunk.len(), "pre-roll evicted oldest bytes");

        self.ring.push(chunk).map_err(|_| VoiceGateError::BufferOverrun {
            stage: "pre-roll",
            chunk: chunk.len(),
            capacity: self.ring.capacity(),
        })
    }

    /// Move up to `max_bytes` of the oldest retained audio into `out`
    /// (appended), capped to the current occupancy and to the configured
    /// lead-in maximum. Returns the number of bytes moved.
    ///
    /// The pre-roll serves a single segment: after assembling a payload
    /// the caller clears the buffer rather than sharing history across
    /// segments.
    pub fn extract_lead_in(&mut self, out: &mut Vec<u8>, max_bytes: usize) -> usize {
        let n = max_bytes.min(self.max_lead_in).min(self.ring.len());
        if n == 0 {
            return 0;
        }

        let start = out.len();
        out.resize(start + n, 0);
        let moved = self.ring.pop(&mut out[start..]);
        out.truncate(start + moved);
        moved
    }

    /// Discard up to `n` of the oldest retained bytes.
    pub fn drop_front(&mut self, n: usize) -> usize {
        self.ring.drop_front(n)
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_never_fails_within_capacity_sized_chunks() {
        let mut preroll = PreRollBuffer::new(16, 16).unwrap();

        // Far more data than capacity; every feed must still succeed.
        for i in 0..50u8 {
            preroll.feed(&[i, i, i]).unwrap();
            assert!(preroll.len() <= preroll.capacity());
        }
    }

    #[test]
    fn retains_most_recent_bytes() {
        let mut preroll = PreRollBuffer::new(8, 8).unwrap();

        for chunk in [[1u8, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]] {
            preroll.feed(&chunk).unwrap();
        }

        let mut out = Vec::new();
        let n = preroll.extract_lead_in(&mut out, 8);
        assert_eq!(n, 8);
        assert_eq!(out, vec![5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn extraction_caps_to_configured_maximum() {
        let mut preroll = PreRollBuffer::new(16, 4).unwrap();
        preroll.feed(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let mut out = Vec::new();
        assert_eq!(preroll.extract_lead_in(&mut out, 100), 4);
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn extraction_caps_to_occupancy() {
        let mut preroll = PreRollBuffer::new(16, 16).unwrap();
        preroll.feed(&[1, 2, 3]).unwrap();

        let mut out = Vec::new();
        assert_eq!(preroll.extract_lead_in(&mut out, 10), 3);
        assert_eq!(out, vec![1, 2, 3]);
        assert!(preroll.is_empty());
    }

    #[test]
    fn extraction_appends_to_existing_output() {
        let mut preroll = PreRollBuffer::new(8, 8).unwrap();
        preroll.feed(&[4, 5, 6]).unwrap();

        let mut out = vec![1, 2, 3];
        preroll.extract_lead_in(&mut out, 3);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn chunk_larger_than_capacity_is_fatal() {
        let mut preroll = PreRollBuffer::new(8, 8).unwrap();
        let err = preroll.feed(&[0; 9]).unwrap_err();
        assert!(matches!(
            err,
            VoiceGateError::BufferOverrun {
                stage: "pre-roll",
                chunk: 9,
                capacity: 8
            }
        ));
    }

    #[test]
    fn eviction_removes_exactly_the_chunk_length() {
        let mut preroll = PreRollBuffer::new(8, 8).unwrap();
        preroll.feed(&[1, 2, 3, 4, 5, 6]).unwrap();
        preroll.feed(&[7, 8, 9, 10]).unwrap();

        // Four bytes were evicted to admit four: [5,6] survive.
        assert_eq!(preroll.len(), 6);
        let mut out = Vec::new();
        preroll.extract_lead_in(&mut out, 8);
        assert_eq!(out, vec![5, 6, 7, 8, 9, 10]);
    }
}

//! Fixed-capacity FIFO byte ring.
//!
//! The storage block is allocated once at construction and never grows.
//! `head` tracks the oldest byte, `tail` the next write position, and
//! `len == (tail - head) mod capacity` at all times (with `len` kept
//! separately so a full buffer is distinguishable from an empty one).
//!
//! All operations are O(bytes moved), never allocate, and never block, so
//! they are safe to call from inside a caller-supplied exclusion scope
//! (see [`SharedRing`](super::SharedRing)).

use crate::error::{Result, VoiceGateError};

/// Fixed-capacity FIFO byte buffer.
///
/// Writes are all-or-nothing: a `push` that does not fit fails without
/// touching the buffer. Reads drain from the front; `peek` observes
/// without draining.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    /// Index of the oldest byte.
    head: usize,
    /// Index of the next write position.
    tail: usize,
    /// Bytes currently held, 0 ≤ len ≤ capacity.
    len: usize,
}

impl RingBuffer {
    /// Create a ring with a fixed `capacity` in bytes.
    ///
    /// # Errors
    /// - `InvalidArgument` if `capacity < 2`.
    /// - `OutOfMemory` if the storage block cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 2 {
            return Err(VoiceGateError::InvalidArgument(format!(
                "ring capacity must be at least 2, got {capacity}"
            )));
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| VoiceGateError::OutOfMemory(capacity))?;
        storage.resize(capacity, 0);

        Ok(Self {
            storage: storage.into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        })
    }

    /// Append `data` at the tail.
    ///
    /// All-or-nothing: on `InsufficientSpace` the buffer is unchanged.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        let available = self.free();
        if data.len() > available {
            return Err(VoiceGateError::InsufficientSpace {
                needed: data.len(),
                available,
            });
        }

        let cap = self.storage.len();
        let first = data.len().min(cap - self.tail);
        self.storage[self.tail..self.tail + first].copy_from_slice(&data[..first]);
        self.storage[..data.len() - first].copy_from_slice(&data[first..]);

        self.tail = (self.tail + data.len()) % cap;
        self.len += data.len();
        debug_assert!(self.index_invariant());
        Ok(())
    }

    /// Remove up to `out.len()` bytes from the front into `out`.
    ///
    /// Returns the number of bytes copied, `min(len, out.len())`, which
    /// is 0 when the buffer is empty. Never fails.
    pub fn pop(&mut self, out: &mut [u8]) -> usize {
        let n = self.len.min(out.len());
        if n == 0 {
            return 0;
        }

        let cap = self.storage.len();
        let first = n.min(cap - self.head);
        out[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        out[first..n].copy_from_slice(&self.storage[..n - first]);

        self.head = (self.head + n) % cap;
        self.len -= n;
        debug_assert!(self.index_invariant());
        n
    }

    /// Copy `out.len()` bytes starting `offset` bytes past the front,
    /// without consuming anything.
    ///
    /// # Errors
    /// `InsufficientData` if `offset + out.len()` exceeds the buffered
    /// length.
    pub fn peek(&self, out: &mut [u8], offset: usize) -> Result<()> {
        let requested = out.len();
        if offset.saturating_add(requested) > self.len {
            return Err(VoiceGateError::InsufficientData {
                requested,
                offset,
                buffered: self.len,
            });
        }

        let cap = self.storage.len();
        let start = (self.head + offset) % cap;
        let first = requested.min(cap - start);
        out[..first].copy_from_slice(&self.storage[start..start + first]);
        out[first..].copy_from_slice(&self.storage[..requested - first]);
        Ok(())
    }

    /// Discard up to `n` bytes from the front without copying them out.
    ///
    /// Returns the number of bytes actually dropped, `min(len, n)`.
    pub fn drop_front(&mut self, n: usize) -> usize {
        let dropped = self.len.min(n);
        self.head = (self.head + dropped) % self.storage.len();
        self.len -= dropped;
        debug_assert!(self.index_invariant());
        dropped
    }

    /// Reset to empty. Storage contents are not wiped.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes that can still be pushed.
    pub fn free(&self) -> usize {
        self.storage.len() - self.len
    }

    fn index_invariant(&self) -> bool {
        let cap = self.storage.len();
        self.head < cap && self.tail < cap && (self.tail + cap - self.head) % cap == self.len % cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_capacity_below_two() {
        assert!(matches!(
            RingBuffer::new(0),
            Err(VoiceGateError::InvalidArgument(_))
        ));
        assert!(matches!(
            RingBuffer::new(1),
            Err(VoiceGateError::InvalidArgument(_))
        ));
        assert!(RingBuffer::new(2).is_ok());
    }

    #[test]
    fn fifo_order_preserved_across_wraparound() {
        let mut ring = RingBuffer::new(8).unwrap();
        let mut out = [0u8; 8];

        // Fill, half-drain, refill to force the indices past the end.
        ring.push(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(ring.pop(&mut out[..4]), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        ring.push(&[7, 8, 9, 10, 11, 12]).unwrap();

        assert_eq!(ring.len(), 8);
        assert_eq!(ring.pop(&mut out), 8);
        assert_eq!(&out, &[5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn push_is_all_or_nothing() {
        let mut ring = RingBuffer::new(4).unwrap();
        ring.push(&[1, 2, 3]).unwrap();

        let err = ring.push(&[4, 5]).unwrap_err();
        match err {
            VoiceGateError::InsufficientSpace { needed, available } => {
                assert_eq!(needed, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Failed push left the contents untouched.
        assert_eq!(ring.len(), 3);
        let mut out = [0u8; 3];
        assert_eq!(ring.pop(&mut out), 3);
        assert_eq!(&out, &[1, 2, 3]);
    }

    #[test]
    fn pop_on_empty_returns_zero() {
        let mut ring = RingBuffer::new(4).unwrap();
        let mut out = [0u8; 4];
        assert_eq!(ring.pop(&mut out), 0);
    }

    #[test]
    fn push_then_pop_restores_occupancy() {
        let mut ring = RingBuffer::new(16).unwrap();
        ring.push(&[9; 5]).unwrap();
        let before = ring.len();

        ring.push(&[1, 2, 3]).unwrap();
        let mut out = [0u8; 3];
        assert_eq!(ring.pop(&mut out), 3);

        // Note: pop drains from the front, so occupancy (not contents)
        // returns to its prior value.
        assert_eq!(ring.len(), before);
    }

    #[test]
    fn peek_does_not_mutate_and_matches_pop() {
        let mut ring = RingBuffer::new(8).unwrap();
        ring.push(&[10, 20, 30, 40, 50]).unwrap();

        let mut peeked = [0u8; 3];
        ring.peek(&mut peeked, 0).unwrap();
        assert_eq!(ring.len(), 5);

        let mut popped = [0u8; 3];
        assert_eq!(ring.pop(&mut popped), 3);
        assert_eq!(peeked, popped);
    }

    #[test]
    fn peek_with_offset_skips_front_bytes() {
        let mut ring = RingBuffer::new(8).unwrap();
        // Shift head so the peeked range wraps.
        ring.push(&[0; 6]).unwrap();
        ring.drop_front(6);
        ring.push(&[1, 2, 3, 4, 5]).unwrap();

        let mut out = [0u8; 2];
        ring.peek(&mut out, 3).unwrap();
        assert_eq!(&out, &[4, 5]);
    }

    #[test]
    fn peek_past_buffered_data_fails() {
        let mut ring = RingBuffer::new(8).unwrap();
        ring.push(&[1, 2, 3]).unwrap();

        let mut out = [0u8; 2];
        let err = ring.peek(&mut out, 2).unwrap_err();
        assert!(matches!(
            err,
            VoiceGateError::InsufficientData {
                requested: 2,
                offset: 2,
                buffered: 3
            }
        ));
    }

    #[test]
    fn drop_front_caps_at_buffered_length() {
        let mut ring = RingBuffer::new(8).unwrap();
        ring.push(&[1, 2, 3, 4]).unwrap();

        assert_eq!(ring.drop_front(2), 2);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.drop_front(10), 2);
        assert!(ring.is_empty());
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut ring = RingBuffer::new(8).unwrap();
        ring.push(&[1, 2, 3]).unwrap();
        ring.clear();

        assert!(ring.is_empty());
        assert_eq!(ring.free(), 8);
        ring.push(&[4; 8]).unwrap();
        assert_eq!(ring.len(), 8);
    }

    #[test]
    fn interleaved_push_pop_byte_trace() {
        // Capacity 10: push six, pop four, push five more, drain.
        let mut ring = RingBuffer::new(10).unwrap();
        ring.push(&[1, 2, 3, 4, 5, 6]).unwrap();

        let mut out = [0u8; 10];
        assert_eq!(ring.pop(&mut out[..4]), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        assert_eq!(ring.len(), 2);

        ring.push(&[7, 8, 9, 10, 11]).unwrap();
        assert_eq!(ring.len(), 7);

        let n = ring.pop(&mut out);
        assert_eq!(n, 7);
        assert_eq!(&out[..n], &[5, 6, 7, 8, 9, 10, 11]);
        assert!(ring.is_empty());
    }

    #[test]
    fn fifo_law_under_random_chunking() {
        // Any push/pop interleaving that never overfills preserves order.
        let mut ring = RingBuffer::new(32).unwrap();
        let stream: Vec<u8> = (0..=255).collect();
        let mut fed = 0usize;
        let mut drained = Vec::new();
        let mut out = [0u8; 7];

        let chunks = [5usize, 11, 3, 8, 1, 13, 2, 9];
        let mut i = 0;
        while drained.len() < stream.len() {
            let take = chunks[i % chunks.len()].min(stream.len() - fed);
            if take > 0 && ring.free() >= take {
                ring.push(&stream[fed..fed + take]).unwrap();
                fed += take;
            }
            let n = ring.pop(&mut out);
            drained.extend_from_slice(&out[..n]);
            i += 1;
        }

        assert_eq!(drained, stream);
    }
}

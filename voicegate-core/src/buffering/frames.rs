//! Reassembly of arbitrary-sized input chunks into exact classifier frames.

use tracing::warn;

use super::ring::RingBuffer;
use crate::error::{Result, VoiceGateError};

/// Accumulates incoming byte chunks and hands out complete frames of a
/// fixed size. Partial frames are never produced; leftover bytes persist
/// until the next `feed`.
#[derive(Debug)]
pub struct FrameAssembler {
    ring: RingBuffer,
    frame_size: usize,
}

impl FrameAssembler {
    /// Create an assembler for frames of `frame_size_bytes`.
    ///
    /// The working buffer is sized to hold one undrained frame plus the
    /// largest chunk a single `feed` may deliver, so a caller that honors
    /// `max_chunk_bytes` can never overrun it.
    pub fn new(frame_size_bytes: usize, max_chunk_bytes: usize) -> Result<Self> {
        if frame_size_bytes == 0 {
            return Err(VoiceGateError::InvalidArgument(
                "frame size must be non-zero".into(),
            ));
        }

        Ok(Self {
            ring: RingBuffer::new(frame_size_bytes + max_chunk_bytes)?,
            frame_size: frame_size_bytes,
        })
    }

    /// Buffer a chunk for frame extraction.
    ///
    /// # Errors
    /// `BufferOverrun` if the chunk does not fit. This is a sizing or
    /// configuration defect (the chunk exceeded the configured maximum),
    /// not a transient condition; the buffered bytes are left untouched
    /// and the assembler remains usable.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.ring.push(chunk).map_err(|e| match e {
            VoiceGateError::InsufficientSpace { .. } => {
                warn!(
                    chunk = chunk.len(),
                    buffered = self.ring.len(),
                    capacity = self.ring.capacity(),
                    "frame queue overrun, chunk exceeds configured maximum"
                );
                VoiceGateError::BufferOverrun {
                    stage: "frame-assembly",
                    chunk: chunk.len(),
                    capacity: self.ring.capacity(),
                }
            }
            other => other,
        })
    }

    /// Extract the next complete frame into `frame`, which must be exactly
    /// `frame_size()` bytes.
    ///
    /// Returns `false` when fewer than one frame's worth of bytes is
    /// buffered. Calling in a loop until `false` drains every complete
    /// frame while leaving the remainder in place.
    pub fn pop_frame(&mut self, frame: &mut [u8]) -> bool {
        debug_assert_eq!(frame.len(), self.frame_size);
        if self.ring.len() < self.frame_size {
            return false;
        }

        // Read the frame in place, then commit by discarding it.
        if self.ring.peek(frame, 0).is_ok() {
            self.ring.drop_front(self.frame_size);
            true
        } else {
            false
        }
    }

    /// Bytes buffered but not yet drained (always < one frame after a full
    /// drain loop).
    pub fn buffered_len(&self) -> usize {
        self.ring.len()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

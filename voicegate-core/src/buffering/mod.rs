//! Byte buffering for the segmentation engine.
//!
//! Two views over the same primitive:
//!
//! - [`RingBuffer`] and the components built on it ([`FrameAssembler`],
//!   [`PreRollBuffer`]) are single-owner: `&mut self` gives the exclusive
//!   mutation the engine's single-stream model requires.
//! - [`SharedRing`] wraps a ring in `Arc<parking_lot::Mutex>` for the
//!   deployment where an audio callback produces while a foreground loop
//!   consumes. Each operation holds the lock for exactly the span of the
//!   index/length update, released on every exit path.

pub mod frames;
pub mod preroll;
pub mod ring;

pub use frames::FrameAssembler;
pub use preroll::PreRollBuffer;
pub use ring::RingBuffer;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Clone-able handle to a ring shared between one producer and one
/// consumer thread.
#[derive(Debug, Clone)]
pub struct SharedRing(Arc<Mutex<RingBuffer>>);

impl SharedRing {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(RingBuffer::new(capacity)?))))
    }

    /// All-or-nothing append; see [`RingBuffer::push`].
    pub fn push(&self, data: &[u8]) -> Result<()> {
        self.0.lock().push(data)
    }

    /// Drain up to `out.len()` bytes; see [`RingBuffer::pop`].
    pub fn pop(&self, out: &mut [u8]) -> usize {
        self.0.lock().pop(out)
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn free(&self) -> usize {
        self.0.lock().free()
    }

    pub fn clear(&self) {
        self.0.lock().clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn shared_ring_capacity_validation_propagates() {
        assert!(SharedRing::new(1).is_err());
        assert!(SharedRing::new(64).is_ok());
    }

    #[test]
    fn producer_consumer_threads_preserve_byte_stream() {
        let ring = SharedRing::new(64).unwrap();
        let stream: Vec<u8> = (0u16..1000).map(|i| (i % 251) as u8).collect();

        let producer_ring = ring.clone();
        let to_send = stream.clone();
        let producer = thread::spawn(move || {
            let mut sent = 0;
            while sent < to_send.len() {
                let take = 13.min(to_send.len() - sent);
                if producer_ring.push(&to_send[sent..sent + take]).is_ok() {
                    sent += take;
                } else {
                    thread::sleep(Duration::from_micros(50));
                }
            }
        });

        let mut received = Vec::new();
        let mut out = [0u8; 17];
        while received.len() < stream.len() {
            let n = ring.pop(&mut out);
            if n == 0 {
                thread::sleep(Duration::from_micros(50));
                continue;
            }
            received.extend_from_slice(&out[..n]);
        }

        producer.join().expect("producer thread panicked");
        assert_eq!(received, stream);
    }
}

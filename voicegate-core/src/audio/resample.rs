//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Capture devices rarely run at the engine's rate (48 kHz hardware
//! feeding a 16 kHz engine is the common case). `RateConverter`
//! bridges the gap on the feed thread, where allocation is allowed.
//! When the rates already match it degenerates to a plain copy and no
//! rubato session is created.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::{error, info};

use crate::error::{Result, VoiceGateError};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Holds partial input between calls; rubato wants fixed blocks.
    pending: Vec<f32>,
    /// Input samples per rubato call.
    block: usize,
    /// Pre-allocated rubato output: `[1][output_frames_max]`.
    output: Vec<Vec<f32>>,
}

impl RateConverter {
    /// # Errors
    /// `AudioDevice` when rubato rejects the configuration.
    pub fn new(source_rate: u32, target_rate: u32, block: usize) -> Result<Self> {
        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                pending: Vec::new(),
                block,
                output: Vec::new(),
            });
        }

        let ratio = f64::from(target_rate) / f64::from(source_rate);
        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio, no dynamic adjustment
            PolynomialDegree::Cubic,
            block,
            1, // mono
        )
        .map_err(|e| VoiceGateError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output = vec![vec![0f32; max_out]; 1];

        info!(source_rate, target_rate, block, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            pending: Vec::new(),
            block,
            output,
        })
    }

    /// Convert `samples`, appending whatever output becomes available
    /// to `out`.
    ///
    /// Input accumulates internally until a full block is available,
    /// so a call may append nothing; the remainder carries over to the
    /// next call.
    pub fn process_into(&mut self, samples: &[f32], out: &mut Vec<f32>) {
        let Some(ref mut resampler) = self.resampler else {
            out.extend_from_slice(samples);
            return;
        };

        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.block {
            let input = &self.pending[..self.block];
            match resampler.process_into_buffer(&[input], &mut self.output, None) {
                Ok((_consumed, produced)) => {
                    out.extend_from_slice(&self.output[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }
            self.pending.drain(..self.block);
        }
    }

    /// Drain the held partial block by zero-padding it to a full one.
    ///
    /// Call at end of stream so the tail of a recording is not lost;
    /// a no-op in passthrough mode or when nothing is pending.
    pub fn flush_into(&mut self, out: &mut Vec<f32>) {
        let Some(ref mut resampler) = self.resampler else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }

        self.pending.resize(self.block, 0.0);
        match resampler.process_into_buffer(&[&self.pending[..]], &mut self.output, None) {
            Ok((_consumed, produced)) => {
                out.extend_from_slice(&self.output[0][..produced]);
            }
            Err(e) => {
                error!("resampler flush error: {e}");
            }
        }
        self.pending.clear();
    }

    /// `true` when no resampling occurs (source rate == target rate).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

//! Audio capture via the cpal backend (`audio-cpal` feature).
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated
//! priority, so it does the minimum: downmix to mono, convert to i16
//! bytes into a reused buffer, and push into a [`SharedRing`] under a
//! short uncontended lock. When the ring is full the chunk is dropped
//! with a warning; the callback never blocks waiting for space.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows,
//! CoreAudio on macOS). Create and drop `AudioCapture` on the same OS
//! thread; the ring may be consumed from anywhere.

pub mod device;
pub mod pcm;
pub mod resample;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

use crate::buffering::SharedRing;
use crate::error::{Result, VoiceGateError};

/// Handle to an active audio capture stream.
///
/// **Not `Send`**: `cpal::Stream` is bound to its creation thread on
/// Windows/macOS. Create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag; set to `false` to make the callback a no-op.
    running: Arc<AtomicBool>,
    /// Actual capture sample rate reported by the device (Hz).
    pub sample_rate: u32,
}

/// Downmix interleaved f32 frames to mono, replacing `mono`'s
/// contents.
#[cfg(feature = "audio-cpal")]
fn downmix(data: &[f32], channels: usize, mono: &mut Vec<f32>) {
    mono.clear();
    if channels <= 1 {
        mono.extend_from_slice(data);
        return;
    }
    mono.reserve(data.len() / channels);
    for frame in data.chunks_exact(channels) {
        mono.push(frame.iter().sum::<f32>() / channels as f32);
    }
}

#[cfg(feature = "audio-cpal")]
fn push_chunk(ring: &SharedRing, bytes: &[u8]) {
    if ring.push(bytes).is_err() {
        warn!(dropped = bytes.len(), "capture ring full, dropping chunk");
    }
}

impl AudioCapture {
    /// Open an input device by preferred name, otherwise fall back to
    /// the default input device and then the first available one.
    #[cfg(feature = "audio-cpal")]
    pub fn open_with_preference(
        ring: SharedRing,
        running: Arc<AtomicBool>,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let mut selected_device = None;

        if let Some(preferred_name) = preferred_device_name {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected_device = devices.find(|device| {
                        device
                            .name()
                            .map(|name| name == preferred_name)
                            .unwrap_or(false)
                    });
                    if selected_device.is_none() {
                        warn!(
                            "preferred input device '{}' not found, falling back",
                            preferred_name
                        );
                    }
                }
                Err(e) => {
                    warn!("failed to list input devices while resolving preference: {e}");
                }
            }
        }

        let device = if let Some(device) = selected_device {
            device
        } else if let Some(default) = host.default_input_device() {
            default
        } else {
            let mut devices = host
                .input_devices()
                .map_err(|e| VoiceGateError::AudioDevice(e.to_string()))?;
            let fallback = devices.next().ok_or(VoiceGateError::NoDefaultInputDevice)?;
            warn!("no default input device, falling back to first available input");
            fallback
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| VoiceGateError::AudioDevice(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        info!(sample_rate, channels, "audio config selected");

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // One flag and ring clone per sample format branch so each
        // closure owns its own.
        let running_f32 = Arc::clone(&running);
        let running_i16 = Arc::clone(&running);
        let running_u8 = Arc::clone(&running);
        let ring_f32 = ring.clone();
        let ring_i16 = ring.clone();
        let ring_u8 = ring;

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                let ch = channels as usize;
                let mut mono: Vec<f32> = Vec::new();
                let mut bytes: Vec<u8> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _info| {
                        if !running_f32.load(Ordering::Relaxed) {
                            return;
                        }
                        downmix(data, ch, &mut mono);
                        pcm::f32_to_bytes(&mono, &mut bytes);
                        push_chunk(&ring_f32, &bytes);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }

            SampleFormat::I16 => {
                let ch = channels as usize;
                let mut bytes: Vec<u8> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _info| {
                        if !running_i16.load(Ordering::Relaxed) {
                            return;
                        }
                        bytes.clear();
                        if ch <= 1 {
                            bytes.reserve(data.len() * 2);
                            for sample in data {
                                bytes.extend_from_slice(&sample.to_le_bytes());
                            }
                        } else {
                            bytes.reserve(data.len() / ch * 2);
                            for frame in data.chunks_exact(ch) {
                                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                                let avg = (sum / ch as i32) as i16;
                                bytes.extend_from_slice(&avg.to_le_bytes());
                            }
                        }
                        push_chunk(&ring_i16, &bytes);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }

            SampleFormat::U8 => {
                let ch = channels as usize;
                let mut bytes: Vec<u8> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[u8], _info| {
                        if !running_u8.load(Ordering::Relaxed) {
                            return;
                        }
                        bytes.clear();
                        bytes.reserve(data.len() / ch * 2);
                        for frame in data.chunks_exact(ch) {
                            // 0..=255 centered on 128, shifted to full-scale i16.
                            let sum: i32 =
                                frame.iter().map(|&s| (i32::from(s) - 128) << 8).sum();
                            let avg = (sum / ch as i32) as i16;
                            bytes.extend_from_slice(&avg.to_le_bytes());
                        }
                        push_chunk(&ring_u8, &bytes);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }

            fmt => {
                return Err(VoiceGateError::AudioDevice(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| VoiceGateError::AudioDevice(e.to_string()))?;

        stream
            .play()
            .map_err(|e| VoiceGateError::AudioDevice(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            sample_rate,
        })
    }

    /// Open the system default microphone and push little-endian i16
    /// mono bytes into `ring` at the device's native rate.
    ///
    /// # Errors
    /// `NoDefaultInputDevice` when no microphone is available, or
    /// `AudioDevice` when cpal fails to build or start the stream.
    #[cfg(feature = "audio-cpal")]
    pub fn open_default(ring: SharedRing, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(ring, running, None)
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Stubs when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open_with_preference(
        _ring: SharedRing,
        _running: Arc<AtomicBool>,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(VoiceGateError::AudioDevice(
            "compiled without audio-cpal feature".into(),
        ))
    }

    pub fn open_default(ring: SharedRing, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(ring, running, None)
    }
}

//! Live mode: microphone capture through the shared ring into the
//! engine, writing utterances as they are confirmed.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver};
use serde::Serialize;
use tracing::info;
use voicegate_core::audio::pcm;
use voicegate_core::{channel_callback, AudioCapture, RateConverter, SharedRing, Utterance};

use crate::wav::{save_utterance, UtteranceRecord};
use crate::{build_engine, engine_config, Params};

/// Ring sized for a few seconds of 48 kHz mono i16 so a briefly stalled
/// consumer does not force the capture callback to drop audio.
const RING_BYTES: usize = 1 << 19;

/// Bytes pulled from the ring per consumer round.
const POP_BYTES: usize = 4096;

#[derive(Debug, Serialize)]
struct LiveReport {
    capture_rate: u32,
    engine_rate: u32,
    frames_classified: u64,
    active_frames: u64,
    utterances: Vec<UtteranceRecord>,
}

pub fn run(params: &Params) -> Result<()> {
    let config = engine_config(params)?;
    let engine_rate = config.sample_rate;
    let max_chunk = config.max_chunk_bytes;
    let mut engine = build_engine(params, config)?;

    let (tx, rx) = bounded::<Utterance>(32);
    engine.register_callback(channel_callback(tx));

    let ring = SharedRing::new(RING_BYTES)?;
    let running = Arc::new(AtomicBool::new(true));
    let capture = AudioCapture::open_with_preference(
        ring.clone(),
        Arc::clone(&running),
        params.device.as_deref(),
    )
    .context("open capture device")?;

    let mut converter = RateConverter::new(capture.sample_rate, engine_rate, 1024)?;
    info!(
        capture_rate = capture.sample_rate,
        engine_rate,
        duration_secs = params.duration,
        "listening"
    );

    let deadline = Instant::now() + Duration::from_secs(params.duration);
    let mut raw = vec![0u8; POP_BYTES];
    let mut samples: Vec<i16> = Vec::new();
    let mut normalized: Vec<f32> = Vec::new();
    let mut resampled: Vec<f32> = Vec::new();
    let mut bytes: Vec<u8> = Vec::new();
    let mut records = Vec::new();

    while Instant::now() < deadline {
        let n = ring.pop(&mut raw);
        if n == 0 {
            drain_channel(&rx, params, engine_rate, &mut records)?;
            thread::sleep(Duration::from_millis(5));
            continue;
        }
        pcm::bytes_to_samples(&raw[..n], &mut samples);
        pcm::samples_to_f32(&samples, &mut normalized);
        resampled.clear();
        converter.process_into(&normalized, &mut resampled);
        pcm::f32_to_bytes(&resampled, &mut bytes);
        for piece in bytes.chunks(max_chunk) {
            engine.feed(piece)?;
        }
        drain_channel(&rx, params, engine_rate, &mut records)?;
    }

    capture.stop();
    drain_channel(&rx, params, engine_rate, &mut records)?;

    let stats = engine.stats();
    info!(
        utterances = records.len(),
        frames = stats.frames_classified,
        active = stats.active_frames,
        "capture finished"
    );

    if params.json {
        let report = LiveReport {
            capture_rate: capture.sample_rate,
            engine_rate,
            frames_classified: stats.frames_classified,
            active_frames: stats.active_frames,
            utterances: records,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} utterance(s) written to {}",
            records.len(),
            params.out_dir.display()
        );
    }
    Ok(())
}

fn drain_channel(
    rx: &Receiver<Utterance>,
    params: &Params,
    sample_rate: u32,
    records: &mut Vec<UtteranceRecord>,
) -> Result<()> {
    for utterance in rx.try_iter() {
        let index = records.len();
        records.push(save_utterance(&params.out_dir, index, &utterance, sample_rate)?);
    }
    Ok(())
}

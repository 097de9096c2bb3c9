//! File mode: run a WAV file through the engine and write each
//! detected utterance out as its own 16-bit mono WAV.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;
use voicegate_core::audio::pcm;
use voicegate_core::{RateConverter, SegmentCollector, Utterance, VoiceGateEngine};

use crate::{build_engine, engine_config, Params};

/// Samples handed to the resampler per call. The resampled output is
/// re-chunked to the engine's feed limit, so upsampling is fine.
const CHUNK_SAMPLES: usize = 2048;

/// One saved utterance, as reported in the JSON summary.
#[derive(Debug, Serialize)]
pub(crate) struct UtteranceRecord {
    pub(crate) index: usize,
    pub(crate) path: PathBuf,
    pub(crate) bytes: usize,
    pub(crate) duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct FileReport {
    input: PathBuf,
    source_rate: u32,
    engine_rate: u32,
    frames_classified: u64,
    active_frames: u64,
    utterances: Vec<UtteranceRecord>,
}

pub fn run(params: &Params, input: &Path) -> Result<()> {
    let config = engine_config(params)?;
    let engine_rate = config.sample_rate;
    let max_chunk = config.max_chunk_bytes;
    let mut engine = build_engine(params, config)?;

    // The collector stays reachable from here so a segment still open
    // at end of file can be flushed instead of silently dropped.
    let collector = Arc::new(Mutex::new(SegmentCollector::new()));
    let sink = Arc::clone(&collector);
    engine.register_callback(move |event| sink.lock().observe(event));

    let (samples, source_rate) = read_wav_mono_f32(input)?;
    info!(
        input = %input.display(),
        source_rate,
        engine_rate,
        samples = samples.len(),
        "segmenting file"
    );

    let mut converter = RateConverter::new(source_rate, engine_rate, CHUNK_SAMPLES)?;
    let mut resampled = Vec::new();
    let mut bytes = Vec::new();
    let mut records = Vec::new();

    for chunk in samples.chunks(CHUNK_SAMPLES) {
        resampled.clear();
        converter.process_into(chunk, &mut resampled);
        pcm::f32_to_bytes(&resampled, &mut bytes);
        feed_bytes(&mut engine, &bytes, max_chunk)?;
        drain_finished(&collector, params, engine_rate, &mut records)?;
    }
    resampled.clear();
    converter.flush_into(&mut resampled);
    pcm::f32_to_bytes(&resampled, &mut bytes);
    feed_bytes(&mut engine, &bytes, max_chunk)?;
    drain_finished(&collector, params, engine_rate, &mut records)?;

    let trailing = collector.lock().finish_pending();
    if let Some(utterance) = trailing {
        let index = records.len();
        records.push(save_utterance(&params.out_dir, index, &utterance, engine_rate)?);
    }

    let stats = engine.stats();
    info!(
        utterances = records.len(),
        frames = stats.frames_classified,
        active = stats.active_frames,
        "file finished"
    );

    if params.json {
        let report = FileReport {
            input: input.to_path_buf(),
            source_rate,
            engine_rate,
            frames_classified: stats.frames_classified,
            active_frames: stats.active_frames,
            utterances: records,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if records.is_empty() {
        println!("no speech found in {}", input.display());
    } else {
        println!(
            "{} utterance(s) written to {}",
            records.len(),
            params.out_dir.display()
        );
    }
    Ok(())
}

/// Feed PCM bytes to the engine in slices the engine's chunk limit
/// accepts.
fn feed_bytes(engine: &mut VoiceGateEngine, bytes: &[u8], max_chunk: usize) -> Result<()> {
    for piece in bytes.chunks(max_chunk) {
        engine.feed(piece)?;
    }
    Ok(())
}

fn drain_finished(
    collector: &Mutex<SegmentCollector>,
    params: &Params,
    sample_rate: u32,
    records: &mut Vec<UtteranceRecord>,
) -> Result<()> {
    loop {
        let utterance = collector.lock().pop_finished();
        let Some(utterance) = utterance else {
            return Ok(());
        };
        let index = records.len();
        records.push(save_utterance(&params.out_dir, index, &utterance, sample_rate)?);
    }
}

/// Write one utterance to `out_dir/utterance-NNN.wav`.
pub(crate) fn save_utterance(
    out_dir: &Path,
    index: usize,
    utterance: &Utterance,
    sample_rate: u32,
) -> Result<UtteranceRecord> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create output directory {}", out_dir.display()))?;
    let path = out_dir.join(format!("utterance-{index:03}.wav"));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)
        .with_context(|| format!("create {}", path.display()))?;
    let mut samples = Vec::new();
    pcm::bytes_to_samples(&utterance.audio, &mut samples);
    for sample in &samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    let duration_ms = utterance.duration_ms(sample_rate);
    info!(
        path = %path.display(),
        bytes = utterance.audio.len(),
        duration_ms,
        "utterance written"
    );
    Ok(UtteranceRecord {
        index,
        path,
        bytes: utterance.audio.len(),
        duration_ms,
    })
}

/// Read a WAV file as mono f32, averaging channels. Handles float and
/// integer sample formats at any bit depth hound supports.
fn read_wav_mono_f32(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("open {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("decode float samples")?,
        hound::SampleFormat::Int => {
            // Full scale depends on the stored bit depth (8 through 32).
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("decode integer samples")?
        }
    };

    if channels == 1 {
        return Ok((interleaved, spec.sample_rate));
    }
    let mut mono = Vec::with_capacity(interleaved.len() / channels);
    for frame in interleaved.chunks_exact(channels) {
        mono.push(frame.iter().sum::<f32>() / channels as f32);
    }
    Ok((mono, spec.sample_rate))
}

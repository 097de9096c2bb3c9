//! `voicegate`: slice speech utterances out of WAV files or live
//! microphone capture.
//!
//! File mode reads a WAV of any rate/channel count, conditions it to
//! the engine rate, and writes one 16-bit mono WAV per detected
//! utterance. Live mode (feature `live`) does the same from the
//! default or a named input device for a bounded duration.

mod wav;

#[cfg(feature = "live")]
mod live;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use voicegate_core::{EngineConfig, FrameDuration, VoiceGateEngine};

#[derive(Parser, Debug)]
#[command(name = "voicegate")]
#[command(version, about = "Extract speech utterances from WAV files or live capture")]
struct Params {
    /// Input WAV file. Any sample rate or channel count; the audio is
    /// downmixed and resampled to the engine rate.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory for the extracted utterance WAVs.
    #[arg(short, long, default_value = "utterances")]
    out_dir: PathBuf,

    /// Engine sample rate in Hz: 8000, 16000, 32000 or 48000.
    #[arg(long, default_value_t = 16_000)]
    rate: u32,

    /// Frame length in milliseconds: 10, 20 or 30.
    #[arg(long, default_value_t = 20)]
    frame_ms: u32,

    /// Classifier aggressiveness, 0 (permissive) through 3 (strict).
    #[arg(long, default_value_t = 1)]
    mode: u8,

    /// Consecutive active frames needed to open an utterance.
    #[arg(long, default_value_t = 3)]
    speech_frames: usize,

    /// Consecutive inactive frames needed to close an utterance.
    #[arg(long, default_value_t = 15)]
    silence_frames: usize,

    /// Audio kept ahead of each utterance onset, in milliseconds.
    #[arg(long, default_value_t = 300)]
    lead_in_ms: u32,

    /// Classify with the WebRTC GMM backend instead of the energy
    /// gate. Needs a binary built with the `webrtc` feature.
    #[arg(long)]
    webrtc: bool,

    /// Print a JSON report of the run to stdout.
    #[arg(long)]
    json: bool,

    /// Capture from the microphone instead of reading a file. Needs a
    /// binary built with the `live` feature.
    #[arg(long)]
    live: bool,

    /// Capture length in seconds for --live.
    #[cfg(feature = "live")]
    #[arg(long, default_value_t = 15)]
    duration: u64,

    /// Input device for --live, by exact name as shown by
    /// --list-devices. Defaults to the system input device.
    #[cfg(feature = "live")]
    #[arg(long)]
    device: Option<String>,

    /// List audio input devices and exit.
    #[arg(long)]
    list_devices: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("voicegate=info,voicegate_core=info")),
        )
        .init();

    if let Err(err) = run() {
        error!(error = ?err, "voicegate failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let params = Params::parse();

    if params.list_devices {
        return list_devices(params.json);
    }

    if params.live {
        #[cfg(feature = "live")]
        return live::run(&params);
        #[cfg(not(feature = "live"))]
        anyhow::bail!("this binary was built without the `live` feature");
    }

    let Some(input) = params.input.clone() else {
        anyhow::bail!("--input <FILE> is required unless --live is given");
    };
    wav::run(&params, &input)
}

fn engine_config(params: &Params) -> Result<EngineConfig> {
    Ok(EngineConfig {
        sample_rate: params.rate,
        frame_duration: FrameDuration::try_from_millis(params.frame_ms)?,
        mode: params.mode,
        speech_threshold: params.speech_frames,
        silence_threshold: params.silence_frames,
        lead_in_ms: params.lead_in_ms,
        ..EngineConfig::default()
    })
}

fn build_engine(params: &Params, config: EngineConfig) -> Result<VoiceGateEngine> {
    if params.webrtc {
        #[cfg(feature = "webrtc")]
        {
            let classifier =
                voicegate_core::WebRtcClassifier::new(config.sample_rate, config.mode)?;
            return Ok(VoiceGateEngine::with_classifier(config, Box::new(classifier))?);
        }
        #[cfg(not(feature = "webrtc"))]
        anyhow::bail!("this binary was built without the `webrtc` feature");
    }
    Ok(VoiceGateEngine::new(config)?)
}

fn list_devices(json: bool) -> Result<()> {
    let devices = voicegate_core::audio::device::list_input_devices();
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    if devices.is_empty() {
        println!("no input devices found");
        return Ok(());
    }
    for device in &devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{marker} {}", device.name);
    }
    Ok(())
}

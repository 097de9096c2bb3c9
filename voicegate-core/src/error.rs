use thiserror::Error;

/// All errors produced by voicegate-core.
#[derive(Debug, Error)]
pub enum VoiceGateError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient space: need {needed} bytes, {available} free")]
    InsufficientSpace { needed: usize, available: usize },

    #[error("insufficient data: {requested} bytes at offset {offset}, only {buffered} buffered")]
    InsufficientData {
        requested: usize,
        offset: usize,
        buffered: usize,
    },

    #[error("buffer overrun in {stage}: chunk of {chunk} bytes exceeds capacity {capacity}")]
    BufferOverrun {
        stage: &'static str,
        chunk: usize,
        capacity: usize,
    },

    #[error("invalid frame length: {samples} samples is not a 10/20/30 ms frame at {sample_rate} Hz")]
    InvalidFrameLength { samples: usize, sample_rate: u32 },

    #[error("unsupported sample rate: {0} Hz")]
    UnsupportedRate(u32),

    #[error("invalid detection mode: {0}")]
    InvalidMode(u8),

    #[error("out of memory: failed to reserve {0} bytes")]
    OutOfMemory(usize),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VoiceGateError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("channel count {0} outside 1..=16")]
    InvalidChannelCount(usize),

    #[error("time {0} outside 0..=1439 minutes")]
    TimeOutOfRange(u16),

    #[error("offset {0} outside -1439..=1439 minutes")]
    OffsetOutOfRange(i16),

    #[error("expected {expected} channel values, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    #[error("PWM value {0} outside 0..=100")]
    PwmOutOfRange(f32),

    #[error("current value {0} outside 0..=5")]
    CurrentOutOfRange(f32),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("corrupt schedule data: {0}")]
    CorruptData(String),

    #[error("schedule contains no points")]
    EmptySchedule,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

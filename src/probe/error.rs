use crate::clock::ClockError;
use crate::filter::FilterError;
use crate::probe::exchange::Mode;
use crate::protocol::FrameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Probe is configured to {configured} and cannot {requested}")]
    InvalidMode { configured: Mode, requested: Mode },

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("Log I/O error: {0}")]
    Log(#[from] std::io::Error),

    #[error("Failed to {mode} required amount: {completed} of {requested} frames")]
    CountMismatch {
        mode: Mode,
        requested: usize,
        completed: usize,
    },

    #[error("Statistics error: {0}")]
    Statistics(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

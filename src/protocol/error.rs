use thiserror::Error;

/// Errors raised while building or decoding a frame
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Padding of {pad_size} bytes exceeds the maximum of {max} bytes")]
    Overflow { pad_size: usize, max: usize },

    #[error("Failed to allocate a {size}-byte frame: {reason}")]
    Alloc { size: usize, reason: String },

    #[error("Frame carries an invalid timestamp: {seconds}s {nanoseconds}ns")]
    InvalidTimestamp { seconds: i64, nanoseconds: i64 },
}

pub type Result<T> = std::result::Result<T, FrameError>;

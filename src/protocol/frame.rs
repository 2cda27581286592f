use crate::clock::ClockSample;
use crate::protocol::error::{FrameError, Result};
use rand::RngCore;
use tracing::debug;

/// Size of the little-endian seconds field
const SECONDS_SIZE: usize = 8;

/// Size of the little-endian nanoseconds field
const NANOSECONDS_SIZE: usize = 8;

/// Size of the timestamp header preceding the padding
pub const HEADER_SIZE: usize = SECONDS_SIZE + NANOSECONDS_SIZE;

/// Largest allocation the frame buffer may request
pub const MAX_ALLOC: usize = isize::MAX as usize;

/// One exchange unit: `[seconds: 8][nanoseconds: 8][padding: N]`.
///
/// The buffer is allocated once and overwritten in place on every iteration.
/// Padding is filled with random bytes at construction so that compressing
/// transports (ssh with compression on, for instance) cannot shrink it; its
/// content carries no meaning and is never read back.
#[derive(Debug)]
pub struct Frame {
    buf: Vec<u8>,
}

impl Frame {
    pub fn new(pad_size: usize) -> Result<Self> {
        if pad_size > MAX_ALLOC - HEADER_SIZE {
            debug!(pad_size = pad_size, "Padding would overflow the frame size");
            return Err(FrameError::Overflow {
                pad_size,
                max: MAX_ALLOC - HEADER_SIZE,
            });
        }

        let size = HEADER_SIZE + pad_size;
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|e| FrameError::Alloc {
                size,
                reason: e.to_string(),
            })?;
        buf.resize(size, 0);
        rand::thread_rng().fill_bytes(&mut buf[HEADER_SIZE..]);

        debug!(size = size, pad_size = pad_size, "Frame allocated");
        Ok(Self { buf })
    }

    /// Header size plus padding size
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn pad_size(&self) -> usize {
        self.buf.len() - HEADER_SIZE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Writes `sample` into the header, leaving the padding untouched.
    pub fn stamp(&mut self, sample: ClockSample) {
        let (seconds, nanoseconds) = self.buf[..HEADER_SIZE].split_at_mut(SECONDS_SIZE);
        seconds.copy_from_slice(&sample.seconds().to_le_bytes());
        nanoseconds.copy_from_slice(&i64::from(sample.nanoseconds()).to_le_bytes());
    }

    /// Decodes the header timestamp.
    pub fn timestamp(&self) -> Result<ClockSample> {
        let mut seconds = [0u8; SECONDS_SIZE];
        let mut nanoseconds = [0u8; NANOSECONDS_SIZE];
        seconds.copy_from_slice(&self.buf[..SECONDS_SIZE]);
        nanoseconds.copy_from_slice(&self.buf[SECONDS_SIZE..HEADER_SIZE]);
        let seconds = i64::from_le_bytes(seconds);
        let nanoseconds = i64::from_le_bytes(nanoseconds);

        u32::try_from(nanoseconds)
            .ok()
            .and_then(|ns| ClockSample::from_parts(seconds, ns))
            .ok_or(FrameError::InvalidTimestamp {
                seconds,
                nanoseconds,
            })
    }
}

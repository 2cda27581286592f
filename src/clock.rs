//! Wall-clock sampling and borrow-corrected clock arithmetic.
//!
//! Sender and receiver are separate processes (often on separate hosts), so
//! samples come from the realtime clock rather than a process-local monotonic
//! one: the receiver compares its own reading against the sender's.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Nanoseconds in one millisecond.
pub const NANOS_PER_MILLI: u32 = 1_000_000;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("System clock is set before the Unix epoch: {0}")]
    BeforeEpoch(#[from] SystemTimeError),

    #[error("System clock reading does not fit in a signed 64-bit second count")]
    OutOfRange,
}

pub type Result<T> = std::result::Result<T, ClockError>;

/// A single clock reading in seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockSample {
    seconds: i64,
    nanoseconds: u32,
}

impl ClockSample {
    /// Builds a sample from its parts, rejecting a nanosecond field outside
    /// `[0, 1e9)`.
    pub fn from_parts(seconds: i64, nanoseconds: u32) -> Option<Self> {
        (nanoseconds < NANOS_PER_SEC).then_some(Self {
            seconds,
            nanoseconds,
        })
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }
}

/// Signed duration between two samples; `nanoseconds` always lies in
/// `[0, 1e9)`, so a negative duration carries its sign in `seconds`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockDiff {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl ClockDiff {
    /// `end - start`, borrowing one second when the nanosecond field of
    /// `end` is the smaller of the two. Seconds saturate instead of wrapping.
    pub fn between(end: ClockSample, start: ClockSample) -> Self {
        if end.nanoseconds < start.nanoseconds {
            Self {
                seconds: end.seconds.saturating_sub(start.seconds).saturating_sub(1),
                nanoseconds: NANOS_PER_SEC - start.nanoseconds + end.nanoseconds,
            }
        } else {
            Self {
                seconds: end.seconds.saturating_sub(start.seconds),
                nanoseconds: end.nanoseconds - start.nanoseconds,
            }
        }
    }

    /// Whole milliseconds, truncating the sub-millisecond remainder.
    pub fn to_millis(&self) -> i64 {
        self.seconds
            .saturating_mul(1000)
            .saturating_add(i64::from(self.nanoseconds / NANOS_PER_MILLI))
    }

    /// Total nanoseconds, saturating at the bounds of `i64`.
    pub fn to_nanos(&self) -> i64 {
        self.seconds
            .saturating_mul(i64::from(NANOS_PER_SEC))
            .saturating_add(i64::from(self.nanoseconds))
    }

    pub fn is_negative(&self) -> bool {
        self.seconds < 0
    }
}

/// Borrow-corrected `end - start`.
pub fn diff(end: ClockSample, start: ClockSample) -> ClockDiff {
    ClockDiff::between(end, start)
}

/// Converts a diff to whole milliseconds for logging.
pub fn to_millis(diff: ClockDiff) -> i64 {
    diff.to_millis()
}

/// Source of clock samples.
pub trait ClockSource {
    /// Takes one reading. A failure here is fatal to the current exchange.
    fn now(&self) -> Result<ClockSample>;
}

/// Realtime system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Result<ClockSample> {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| {
            warn!(error = %e, "System clock reads before the Unix epoch");
            ClockError::BeforeEpoch(e)
        })?;
        let seconds = i64::try_from(elapsed.as_secs()).map_err(|_| ClockError::OutOfRange)?;
        Ok(ClockSample {
            seconds,
            nanoseconds: elapsed.subsec_nanos(),
        })
    }
}


#[cfg(test)]
pub use tests::MockClockSource;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_diff_nanos_always_normalised(
            end_s in -1_000_000i64..1_000_000,
            end_ns in 0u32..NANOS_PER_SEC,
            start_s in -1_000_000i64..1_000_000,
            start_ns in 0u32..NANOS_PER_SEC,
        ) {
            let end = ClockSample::from_parts(end_s, end_ns).unwrap();
            let start = ClockSample::from_parts(start_s, start_ns).unwrap();
            let d = diff(end, start);
            prop_assert!(d.nanoseconds < NANOS_PER_SEC);

            let expected = (end_s as i128 * 1_000_000_000 + end_ns as i128)
                - (start_s as i128 * 1_000_000_000 + start_ns as i128);
            prop_assert_eq!(d.to_nanos() as i128, expected);
        }
    }
}

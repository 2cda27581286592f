//! Constants shared by the probe and its command line

/// Environment variable naming the receiver's record log
pub const ENV_TIMESTAMP_OUTPUT: &str = "TIMESTAMP_OUTPUT";

/// Log path value that aliases standard output
pub const STDOUT_PATH: &str = "-";

/// Header line written before the first record of a run
pub const RECORD_HEADER: &str = "DELTA,NORMALIZED";

/// Header line for the raw receive-time format
pub const SAMPLE_HEADER: &str = "SECONDS,NANOSECONDS";

/// Histogram lower bound in nanoseconds
pub const HISTOGRAM_LOW_BOUND_NS: u64 = 100;

/// Histogram upper bound in nanoseconds (one hour)
pub const HISTOGRAM_HIGH_BOUND_NS: u64 = 3_600_000_000_000;

/// Histogram significant digits for precision
pub const HISTOGRAM_SIGNIFICANT_DIGITS: u8 = 3;

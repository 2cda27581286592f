use crate::clock::{ClockDiff, ClockSample, NANOS_PER_SEC};
use crate::probe::constants::{RECORD_HEADER, SAMPLE_HEADER, STDOUT_PATH};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Destination of the record log.
///
/// `Stdout` aliases the process stream and is never closed; `File` is owned
/// and closed exactly once, when the sink is dropped.
#[derive(Debug)]
pub enum LogSink {
    Stdout(io::Stdout),
    File(File),
}

impl LogSink {
    pub fn stdout() -> Self {
        Self::Stdout(io::stdout())
    }

    /// Creates or truncates `path`, or aliases standard output for `-`.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == STDOUT_PATH {
            return Ok(Self::stdout());
        }
        debug!(path = %path.display(), "Opening record log");
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map(Self::File)
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::File(_))
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(stdout) => stdout,
            Self::File(file) => file,
        }
    }
}

/// How each record is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordFormat {
    /// Whole milliseconds, sub-millisecond remainder truncated
    #[default]
    Millis,
    /// `seconds.nanoseconds` with nine fractional digits
    Timespec,
    /// Raw receive-time clock reading, `seconds,nanoseconds` since the epoch
    Sample,
}

impl RecordFormat {
    /// Column header written once before the first record
    pub fn header(self) -> &'static str {
        match self {
            Self::Millis | Self::Timespec => RECORD_HEADER,
            Self::Sample => SAMPLE_HEADER,
        }
    }
}

impl FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "millis" => Ok(Self::Millis),
            "timespec" => Ok(Self::Timespec),
            "sample" => Ok(Self::Sample),
            other => Err(format!(
                "unknown record format '{}' (expected millis, timespec or sample)",
                other
            )),
        }
    }
}

/// One received frame's timing.
///
/// `received` is the clock reading taken right after the frame arrived,
/// `delta` is that minus the frame's embedded send time and `normalized` is
/// that minus the send time of the first frame of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    pub received: ClockSample,
    pub delta: ClockDiff,
    pub normalized: ClockDiff,
}

struct Rendered<'a>(&'a ClockDiff, RecordFormat);

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rendered(diff, format) = self;
        match format {
            RecordFormat::Millis | RecordFormat::Sample => write!(f, "{}", diff.to_millis()),
            RecordFormat::Timespec if diff.is_negative() => {
                // -1s + 999_999_990ns reads as -0.000000010
                let magnitude = (NANOS_PER_SEC - diff.nanoseconds) % NANOS_PER_SEC;
                let seconds = if diff.nanoseconds == 0 {
                    diff.seconds.unsigned_abs()
                } else {
                    (diff.seconds + 1).unsigned_abs()
                };
                write!(f, "-{}.{:09}", seconds, magnitude)
            }
            RecordFormat::Timespec => write!(f, "{}.{:09}", diff.seconds, diff.nanoseconds),
        }
    }
}

/// Appends one line per record and flushes after every line, so the log
/// survives the process being killed mid-run.
#[derive(Debug)]
pub struct Logger {
    sink: LogSink,
    format: RecordFormat,
    header_written: bool,
    records: u64,
    line: String,
}

impl Logger {
    pub fn new(sink: LogSink, format: RecordFormat) -> Self {
        Self {
            sink,
            format,
            header_written: false,
            records: 0,
            line: String::new(),
        }
    }

    pub fn append(&mut self, record: &LogRecord) -> io::Result<()> {
        use std::fmt::Write as _;

        self.line.clear();
        if !self.header_written {
            self.line.push_str(self.format.header());
            self.line.push('\n');
        }
        // Writing into a String cannot fail.
        let _ = match self.format {
            RecordFormat::Sample => writeln!(
                self.line,
                "{},{}",
                record.received.seconds(),
                record.received.nanoseconds()
            ),
            _ => writeln!(
                self.line,
                "{},{}",
                Rendered(&record.delta, self.format),
                Rendered(&record.normalized, self.format)
            ),
        };

        let writer = self.sink.writer();
        writer.write_all(self.line.as_bytes())?;
        writer.flush()?;

        self.header_written = true;
        self.records += 1;
        Ok(())
    }

    /// Records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn into_sink(self) -> LogSink {
        self.sink
    }
}

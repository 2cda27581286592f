use crate::clock::{ClockDiff, ClockSample, ClockSource, SystemClock};
use crate::filter::{Encoding, Endpoint, FilterChain, StreamFilter};
use crate::probe::error::{ProbeError, Result};
use crate::probe::logger::{LogRecord, Logger};
use crate::probe::statistics::Statistics;
use crate::protocol::Frame;
use std::fmt;
use tracing::{debug, info, warn};

/// Direction a probe is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Send,
    Receive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => f.write_str("send"),
            Self::Receive => f.write_str("receive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Sending,
    Receiving,
}

/// Outcome of one `send` or `recv` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    pub mode: Mode,
    pub requested: usize,
    pub completed: usize,
}

impl Exchange {
    pub fn is_complete(&self) -> bool {
        self.completed == self.requested
    }

    /// Turns a short exchange into [`ProbeError::CountMismatch`].
    pub fn ensure_complete(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(ProbeError::CountMismatch {
                mode: self.mode,
                requested: self.requested,
                completed: self.completed,
            })
        }
    }
}

/// Sender/receiver state machine.
///
/// Owns its frame buffer and transform filter for its whole life. The raw
/// endpoint is attached at the start of each exchange and detached (then
/// dropped, closing it only if owned) at the end, on every exit path.
pub struct Probe<F = FilterChain, C = SystemClock> {
    mode: Mode,
    state: State,
    frame: Frame,
    filter: F,
    clock: C,
    logger: Option<Logger>,
    stats: Statistics,
}

impl Probe {
    /// Builds a sender. Frames are `pad_size` bytes longer than the header.
    pub fn sender(pad_size: usize, encoding: Encoding) -> Result<Self> {
        Self::with_parts(
            Mode::Send,
            pad_size,
            FilterChain::new(encoding),
            SystemClock,
            None,
        )
    }

    /// Builds a receiver that appends one record per frame to `logger`.
    pub fn receiver(pad_size: usize, encoding: Encoding, logger: Logger) -> Result<Self> {
        Self::with_parts(
            Mode::Receive,
            pad_size,
            FilterChain::new(encoding),
            SystemClock,
            Some(logger),
        )
    }
}

impl<F: StreamFilter, C: ClockSource> Probe<F, C> {
    pub fn with_parts(
        mode: Mode,
        pad_size: usize,
        filter: F,
        clock: C,
        logger: Option<Logger>,
    ) -> Result<Self> {
        if mode == Mode::Receive && logger.is_none() {
            return Err(ProbeError::Config(
                "a receiving probe needs a record log".into(),
            ));
        }
        let frame = Frame::new(pad_size)?;
        debug!(mode = %mode, frame_size = frame.size(), "Probe created");

        Ok(Self {
            mode,
            state: State::Idle,
            frame,
            filter,
            clock,
            logger,
            stats: Statistics::new()?,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn frame_size(&self) -> usize {
        self.frame.size()
    }

    /// Delta distribution over every frame received so far
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    fn transition(&mut self, next: State) {
        debug!(from = ?self.state, to = ?next, "Probe state change");
        self.state = next;
    }

    fn ensure_mode(&self, requested: Mode) -> Result<()> {
        if self.mode != requested {
            warn!(configured = %self.mode, requested = %requested, "Operation does not match probe mode");
            return Err(ProbeError::InvalidMode {
                configured: self.mode,
                requested,
            });
        }
        Ok(())
    }

    /// Stamps and writes `count` frames to `output`.
    ///
    /// A short or failed write stops the loop; the shortfall is reported in
    /// the returned [`Exchange`]. The filter is flushed and `output` detached
    /// whether or not the loop ran to completion. A flush failure is an error
    /// only when every frame was written.
    pub fn send(&mut self, count: usize, output: Endpoint) -> Result<Exchange> {
        self.ensure_mode(Mode::Send)?;
        self.filter.push(output)?;
        self.transition(State::Sending);
        info!(count = count, frame_size = self.frame.size(), "Sending frames");

        let sent = self.send_frames(count);
        let flushed = self.filter.flush();
        self.filter.pop();
        self.transition(State::Idle);

        let completed = sent?;
        if let Err(e) = flushed {
            warn!(error = %e, completed = completed, "Failed to flush the filter chain");
            // After a short write the held-back bytes have nowhere to go;
            // the shortfall is what gets reported.
            if completed == count {
                return Err(e.into());
            }
        }

        info!(requested = count, completed = completed, "Send finished");
        Ok(Exchange {
            mode: Mode::Send,
            requested: count,
            completed,
        })
    }

    fn send_frames(&mut self, count: usize) -> Result<usize> {
        let size = self.frame.size();
        for i in 0..count {
            let now = self.clock.now()?;
            self.frame.stamp(now);

            match self.filter.write(self.frame.as_bytes()) {
                Ok(n) if n == size => {
                    debug!(frame = i, seconds = now.seconds(), nanoseconds = now.nanoseconds(), "Frame sent");
                }
                Ok(n) => {
                    warn!(frame = i, written = n, expected = size, "Short write, stopping");
                    return Ok(i);
                }
                Err(e) => {
                    warn!(frame = i, error = %e, "Write failed, stopping");
                    return Ok(i);
                }
            }
        }
        Ok(count)
    }

    /// Reads `count` frames from `input`, logging one record per frame.
    ///
    /// The clock is sampled right after each read unblocks. A short or failed
    /// read, a frame with a corrupt timestamp, or a failed log write stops the
    /// loop; the shortfall is reported in the returned [`Exchange`].
    pub fn recv(&mut self, count: usize, input: Endpoint) -> Result<Exchange> {
        self.ensure_mode(Mode::Receive)?;
        self.filter.push(input)?;
        self.transition(State::Receiving);
        info!(count = count, frame_size = self.frame.size(), "Receiving frames");

        let received = self.recv_frames(count);
        self.filter.pop();
        self.transition(State::Idle);

        let completed = received?;
        info!(requested = count, completed = completed, "Receive finished");
        Ok(Exchange {
            mode: Mode::Receive,
            requested: count,
            completed,
        })
    }

    fn recv_frames(&mut self, count: usize) -> Result<usize> {
        let size = self.frame.size();
        let logger = self
            .logger
            .as_mut()
            .ok_or_else(|| ProbeError::Config("no record log attached".into()))?;
        let mut origin: Option<ClockSample> = None;

        for i in 0..count {
            match self.filter.read(self.frame.as_bytes_mut()) {
                Ok(n) if n == size => {}
                Ok(n) => {
                    warn!(frame = i, read = n, expected = size, "Short read, stopping");
                    return Ok(i);
                }
                Err(e) => {
                    warn!(frame = i, error = %e, "Read failed, stopping");
                    return Ok(i);
                }
            }
            let now = self.clock.now()?;

            let sent = match self.frame.timestamp() {
                Ok(sent) => sent,
                Err(e) => {
                    warn!(frame = i, error = %e, "Corrupt frame, stopping");
                    return Ok(i);
                }
            };
            let origin = *origin.get_or_insert(sent);
            let record = LogRecord {
                received: now,
                delta: ClockDiff::between(now, sent),
                normalized: ClockDiff::between(now, origin),
            };

            if let Err(e) = logger.append(&record) {
                warn!(frame = i, error = %e, "Failed to append record, stopping");
                return Ok(i);
            }
            let delta_ns = record.delta.to_nanos();
            if let Err(e) = self.stats.record(delta_ns) {
                warn!(frame = i, error = %e, "Delta left out of the summary");
            }
            debug!(frame = i, delta_ns = delta_ns, "Frame received");
        }
        Ok(count)
    }
}

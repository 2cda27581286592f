use crate::probe::constants::*;
use crate::probe::error::{ProbeError, Result};
use hdrhistogram::Histogram;
use tracing::{debug, warn};

/// Running distribution of one-way deltas, in nanoseconds.
///
/// Deltas are folded in one at a time, so memory stays fixed no matter how
/// many frames arrive. A negative delta means the receiver's clock reads
/// earlier than the sender's; those are tallied and left out of the
/// histogram.
pub struct Statistics {
    hist: Histogram<u64>,
    real_min: u64,
    real_max: u64,
    clamped_count: usize,
    negative_count: usize,
}

impl Statistics {
    pub fn new() -> Result<Self> {
        let hist = Histogram::<u64>::new_with_bounds(
            HISTOGRAM_LOW_BOUND_NS,
            HISTOGRAM_HIGH_BOUND_NS,
            HISTOGRAM_SIGNIFICANT_DIGITS,
        )
        .map_err(|e| ProbeError::Statistics(format!("Failed to create histogram: {}", e)))?;

        Ok(Self {
            hist,
            real_min: u64::MAX,
            real_max: 0,
            clamped_count: 0,
            negative_count: 0,
        })
    }

    /// Builds a summary over a finished batch of deltas.
    pub fn from_deltas(deltas_ns: &[i64]) -> Result<Self> {
        let mut stats = Self::new()?;
        for &delta in deltas_ns {
            stats.record(delta)?;
        }
        Ok(stats)
    }

    /// Folds one delta into the summary.
    ///
    /// Deltas outside the histogram bounds are clamped into it; `min` and
    /// `max` still report the exact values.
    pub fn record(&mut self, delta_ns: i64) -> Result<()> {
        let Ok(delta) = u64::try_from(delta_ns) else {
            self.negative_count += 1;
            if self.negative_count == 1 {
                warn!(
                    delta_ns = delta_ns,
                    "Negative delta; sender and receiver clocks disagree"
                );
            }
            return Ok(());
        };

        let clamped = delta.clamp(HISTOGRAM_LOW_BOUND_NS, HISTOGRAM_HIGH_BOUND_NS);
        if clamped != delta {
            self.clamped_count += 1;
            debug!(delta_ns = delta, clamped_ns = clamped, "Delta outside histogram bounds");
        }
        self.hist
            .record(clamped)
            .map_err(|e| ProbeError::Statistics(format!("Failed to record delta {}: {}", delta, e)))?;

        self.real_min = self.real_min.min(delta);
        self.real_max = self.real_max.max(delta);
        Ok(())
    }

    pub fn mean(&self) -> f64 {
        self.hist.mean()
    }

    /// Smallest non-negative delta seen, 0 when there is none
    pub fn min(&self) -> u64 {
        if self.real_min == u64::MAX {
            0
        } else {
            self.real_min
        }
    }

    pub fn max(&self) -> u64 {
        self.real_max
    }

    /// Delta at `quantile` (0.0..=1.0), at histogram precision
    pub fn percentile(&self, quantile: f64) -> u64 {
        self.hist.value_at_quantile(quantile)
    }

    pub fn clamped_count(&self) -> usize {
        self.clamped_count
    }

    pub fn negative_count(&self) -> usize {
        self.negative_count
    }

    /// Deltas in the histogram; negatives are not included
    pub fn count(&self) -> u64 {
        self.hist.len()
    }
}

//! Samples-per-second meter.
//!
//! Every timed batch contributes `batch_size / elapsed_secs` to the run's
//! sequence. At each epoch end the meter prints the median throughput of
//! the whole run so far, not just of the epoch that ended.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{HookError, HookResult};
use crate::observer::{Logs, TrainingObserver};
use crate::stats::median;

/// Running throughput summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSummary {
    /// Number of batches measured so far.
    pub batches: usize,
    /// Median samples processed per second.
    pub median_samples_per_sec: f64,
}

impl fmt::Display for ThroughputSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Samples/sec: {:.2}", self.median_samples_per_sec)
    }
}

/// Observer measuring samples per second with a fixed batch size.
#[derive(Debug)]
pub struct ThroughputMeter<C: Clock = SystemClock> {
    clock: C,
    console: bool,
    batch_size: usize,
    batch_start: Option<Instant>,
    samples_per_sec: Vec<f64>,
}

impl ThroughputMeter<SystemClock> {
    /// Creates a meter on the system clock.
    ///
    /// # Errors
    ///
    /// [`HookError::InvalidBatchSize`] if `batch_size` is zero.
    pub fn new(batch_size: usize) -> HookResult<Self> {
        Self::with_clock(batch_size, SystemClock)
    }
}

impl<C: Clock> ThroughputMeter<C> {
    /// Creates a meter reading time from `clock`.
    ///
    /// # Errors
    ///
    /// [`HookError::InvalidBatchSize`] if `batch_size` is zero.
    pub fn with_clock(batch_size: usize, clock: C) -> HookResult<Self> {
        if batch_size == 0 {
            return Err(HookError::InvalidBatchSize(batch_size));
        }

        Ok(Self {
            clock,
            console: true,
            batch_size,
            batch_start: None,
            samples_per_sec: Vec::new(),
        })
    }

    /// Enables or disables the stdout summary line.
    #[must_use]
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Configured number of samples per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Per-batch throughput of the run, in recording order.
    pub fn samples_per_sec(&self) -> &[f64] {
        &self.samples_per_sec
    }

    /// Median throughput of the run so far.
    ///
    /// # Errors
    ///
    /// [`HookError::NoSamples`] before the first batch has been timed.
    pub fn summary(&self) -> HookResult<ThroughputSummary> {
        let median_samples_per_sec = median(&self.samples_per_sec)
            .ok_or(HookError::NoSamples { what: "throughput" })?;

        Ok(ThroughputSummary {
            batches: self.samples_per_sec.len(),
            median_samples_per_sec,
        })
    }

    /// Prints the running median throughput.
    pub fn print_results(&self) {
        match self.summary() {
            Ok(summary) => {
                info!(
                    batches = summary.batches,
                    median_samples_per_sec = summary.median_samples_per_sec,
                    "throughput"
                );
                if self.console {
                    println!("{summary}");
                }
            }
            Err(err) => warn!(%err, "throughput report skipped"),
        }
    }
}

impl<C: Clock> TrainingObserver for ThroughputMeter<C> {
    fn on_train_begin(&mut self, _logs: Option<&Logs>) {
        self.samples_per_sec.clear();
        self.batch_start = None;
    }

    fn on_batch_begin(&mut self, _batch: usize, _logs: Option<&Logs>) {
        self.batch_start = Some(self.clock.now());
    }

    fn on_batch_end(&mut self, batch: usize, _logs: Option<&Logs>) {
        let Some(start) = self.batch_start.take() else {
            warn!(batch, "batch end without matching batch begin; sample dropped");
            return;
        };

        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(start)
            .as_secs_f64();
        // No clamping: a zero-length batch yields +inf.
        #[allow(clippy::cast_precision_loss)]
        let throughput = self.batch_size as f64 / elapsed;
        self.samples_per_sec.push(throughput);
        debug!(batch, elapsed_secs = elapsed, samples_per_sec = throughput, "batch throughput");
    }

    fn on_epoch_end(&mut self, _epoch: usize, _logs: Option<&Logs>) {
        self.print_results();
    }
}

//! Wall-clock timing of batches and epochs.
//!
//! [`BatchTimer`] measures every batch between `on_batch_begin` and
//! `on_batch_end`, and derives epoch times as the sum of their batches.
//! At each epoch end it prints the median batch time and the epoch time;
//! at train end it prints the overall median batch time and the median
//! epoch time. All times are in seconds.
//!
//! ```
//! use std::time::Duration;
//! use train_hooks::batch_timer::BatchTimer;
//! use train_hooks::clock::ManualClock;
//! use train_hooks::observer::TrainingObserver;
//!
//! let clock = ManualClock::new();
//! let mut timer = BatchTimer::with_clock(clock.clone()).with_console(false);
//!
//! timer.on_train_begin(None);
//! timer.on_epoch_begin(0, None);
//! for batch in 0..3 {
//!     timer.on_batch_begin(batch, None);
//!     clock.advance(Duration::from_millis(100));
//!     timer.on_batch_end(batch, None);
//! }
//! timer.on_epoch_end(0, None);
//!
//! let epoch = timer.last_epoch().unwrap();
//! assert!((epoch.epoch_secs - 0.3).abs() < 1e-9);
//! ```

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{HookError, HookResult};
use crate::observer::{Logs, TrainingObserver};
use crate::stats::{median, sum};

/// Timing summary of a single epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochTiming {
    /// Epoch index as reported by the host loop.
    pub epoch: usize,
    /// Number of batches timed in the epoch.
    pub batches: usize,
    /// Median batch time, in seconds.
    pub median_batch_secs: f64,
    /// Sum of the epoch's batch times, in seconds.
    pub epoch_secs: f64,
}

impl fmt::Display for EpochTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch timing - batch (median): {:.5}, epoch: {:.5} (sec)",
            self.median_batch_secs, self.epoch_secs
        )
    }
}

/// Timing summary of a whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainTiming {
    /// Number of epochs recorded.
    pub epochs: usize,
    /// Number of batches recorded across all epochs.
    pub batches: usize,
    /// Median of every batch time in the run, in seconds.
    pub median_batch_secs: f64,
    /// Median of the epoch times, in seconds.
    pub median_epoch_secs: f64,
}

impl fmt::Display for TrainTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Overall - batch (median): {:.5}, epoch (median): {:.5} (sec)",
            self.median_batch_secs, self.median_epoch_secs
        )
    }
}

/// Observer measuring robust timing statistics for batches and epochs.
#[derive(Debug)]
pub struct BatchTimer<C: Clock = SystemClock> {
    clock: C,
    console: bool,

    batch_start: Option<Instant>,
    epoch_batch_times: Vec<f64>,

    all_batch_times: Vec<f64>,
    all_epoch_times: Vec<f64>,

    last_epoch: Option<EpochTiming>,
}

impl BatchTimer<SystemClock> {
    /// Creates a timer on the system clock that prints its summaries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for BatchTimer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> BatchTimer<C> {
    /// Creates a timer reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            console: true,
            batch_start: None,
            epoch_batch_times: Vec::new(),
            all_batch_times: Vec::new(),
            all_epoch_times: Vec::new(),
            last_epoch: None,
        }
    }

    /// Enables or disables the stdout summary lines.
    ///
    /// Accumulation and `tracing` events are unaffected.
    #[must_use]
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Batch times of the current epoch, in recording order.
    pub fn epoch_batch_times(&self) -> &[f64] {
        &self.epoch_batch_times
    }

    /// Every batch time of the run, in recording order.
    pub fn all_batch_times(&self) -> &[f64] {
        &self.all_batch_times
    }

    /// Every epoch time of the run, in recording order.
    pub fn all_epoch_times(&self) -> &[f64] {
        &self.all_epoch_times
    }

    /// Summary of the most recently completed epoch.
    pub fn last_epoch(&self) -> Option<EpochTiming> {
        self.last_epoch
    }

    /// Summarises the batches recorded so far in the current epoch.
    ///
    /// # Errors
    ///
    /// [`HookError::EmptyEpoch`] when no batch has been recorded.
    pub fn epoch_summary(&self, epoch: usize) -> HookResult<EpochTiming> {
        let median_batch_secs =
            median(&self.epoch_batch_times).ok_or(HookError::EmptyEpoch { epoch })?;

        Ok(EpochTiming {
            epoch,
            batches: self.epoch_batch_times.len(),
            median_batch_secs,
            epoch_secs: sum(&self.epoch_batch_times),
        })
    }

    /// Summarises the whole run so far.
    ///
    /// # Errors
    ///
    /// [`HookError::NoSamples`] when no batch or no epoch has been recorded.
    pub fn summary(&self) -> HookResult<TrainTiming> {
        let median_batch_secs = median(&self.all_batch_times)
            .ok_or(HookError::NoSamples { what: "batch times" })?;
        let median_epoch_secs = median(&self.all_epoch_times)
            .ok_or(HookError::NoSamples { what: "epoch times" })?;

        Ok(TrainTiming {
            epochs: self.all_epoch_times.len(),
            batches: self.all_batch_times.len(),
            median_batch_secs,
            median_epoch_secs,
        })
    }
}

impl<C: Clock> TrainingObserver for BatchTimer<C> {
    fn on_train_begin(&mut self, _logs: Option<&Logs>) {
        self.all_batch_times.clear();
        self.all_epoch_times.clear();
        self.epoch_batch_times.clear();
        self.batch_start = None;
        self.last_epoch = None;
    }

    fn on_epoch_begin(&mut self, epoch: usize, _logs: Option<&Logs>) {
        if self.batch_start.take().is_some() {
            warn!(epoch, "batch still open at epoch begin; sample dropped");
        }
        self.epoch_batch_times.clear();
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
        self.epoch_batch_times.push(elapsed);
        self.all_batch_times.push(elapsed);
        debug!(batch, elapsed_secs = elapsed, "batch timed");
    }

    fn on_epoch_end(&mut self, epoch: usize, _logs: Option<&Logs>) {
        match self.epoch_summary(epoch) {
            Ok(timing) => {
                self.all_epoch_times.push(timing.epoch_secs);
                self.last_epoch = Some(timing);
                info!(
                    epoch,
                    batches = timing.batches,
                    median_batch_secs = timing.median_batch_secs,
                    epoch_secs = timing.epoch_secs,
                    "epoch timing"
                );
                if self.console {
                    println!("{timing}");
                }
            }
            Err(err) => warn!(epoch, %err, "epoch timing skipped"),
        }
    }

    fn on_train_end(&mut self, _logs: Option<&Logs>) {
        match self.summary() {
            Ok(timing) => {
                info!(
                    epochs = timing.epochs,
                    batches = timing.batches,
                    median_batch_secs = timing.median_batch_secs,
                    median_epoch_secs = timing.median_epoch_secs,
                    "overall timing"
                );
                if self.console {
                    println!("{timing}");
                }
            }
            Err(err) => warn!(%err, "overall timing skipped"),
        }
    }
}

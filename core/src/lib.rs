//! train-hooks: observers for a training loop.
//!
//! Three independent instrumentation hooks, driven by the host training
//! loop through the [`TrainingObserver`] lifecycle:
//!
//! - [`BatchTimer`]: wall-clock time of every batch and epoch, with median
//!   summaries per epoch and per run;
//! - [`ThroughputMeter`]: samples per second for a fixed batch size, with a
//!   running median printed at each epoch end;
//! - [`WindowedProfilerToggle`]: starts an external profiler at a given
//!   epoch and stops it after a given number of batches.
//!
//! ```text
//! ┌──────────────────────┐   on_train_begin / on_epoch_* / on_batch_* / on_train_end
//! │   host train loop    │ ─────────────────────────────────────────────────────────┐
//! └──────────────────────┘                                                          │
//!          ┌───────────────────────┬──────────────────────────┬───────────────────┘
//!          ▼                       ▼                          ▼
//!   ┌─────────────┐        ┌────────────────┐      ┌────────────────────────┐
//!   │ BatchTimer  │        │ ThroughputMeter│      │ WindowedProfilerToggle │──▶ ProfilerControl
//!   └─────────────┘        └────────────────┘      └────────────────────────┘
//!          │ Clock                 │ Clock
//! ```
//!
//! Everything is single-threaded and synchronous. Time is read through an
//! injected [`Clock`] and the profiler through an injected
//! [`ProfilerControl`], so both can be replaced by fakes.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

/// Batch and epoch wall-clock timer.
pub mod batch_timer;
/// Injectable time sources.
pub mod clock;
/// Configuration from YAML and environment variables.
pub mod config;
/// Error types.
pub mod error;
/// Lifecycle trait implemented by every observer.
pub mod observer;
/// Windowed profiler toggle and the profiler capability trait.
pub mod profiler;
/// Median and sum helpers.
pub mod stats;
/// Samples-per-second meter.
pub mod throughput;

pub use crate::batch_timer::{BatchTimer, EpochTiming, TrainTiming};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{HooksConfig, ProfilerWindowConfig};
pub use crate::error::{HookError, HookResult};
pub use crate::observer::{Logs, TrainingObserver};
pub use crate::profiler::{ProfilerControl, ProfilerState, WindowedProfilerToggle};
pub use crate::throughput::{ThroughputMeter, ThroughputSummary};

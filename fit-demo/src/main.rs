#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Demo executable for train-hooks.
//!
//! Runs a simulated training loop with the observers selected by the
//! configuration and prints their summaries.
//!
//! ```text
//! fit-demo [CONFIG.yaml] [--real-time]
//! ```
//!
//! Without `--real-time` the batches advance a manual clock, so the run is
//! instant and deterministic. Environment variables (`TRAIN_HOOKS_*`)
//! override the file; `RUST_LOG` controls log verbosity.

mod host;
mod tracing_profiler;

use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use train_hooks::{
    BatchTimer, Clock, HooksConfig, ManualClock, SystemClock, ThroughputMeter, TrainingObserver,
    WindowedProfilerToggle,
};

use crate::host::{fit, RunShape};
use crate::tracing_profiler::TracingProfiler;

/// Command-line options.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    real_time: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--real-time" => args.real_time = true,
            flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
            path => {
                if args.config.is_some() {
                    bail!("only one configuration file may be given");
                }
                args.config = Some(PathBuf::from(path));
            }
        }
    }
    Ok(args)
}

/// Builds the observers enabled in `cfg`, all reading time from `clock`.
fn build_observers<'a, C>(
    cfg: &HooksConfig,
    clock: &C,
    profiler: &'a mut TracingProfiler,
) -> Result<Vec<Box<dyn TrainingObserver + 'a>>>
where
    C: Clock + Clone + 'a,
{
    let mut observers: Vec<Box<dyn TrainingObserver + 'a>> = Vec::new();

    if cfg.timing {
        observers.push(Box::new(BatchTimer::with_clock(clock.clone())));
    }
    if cfg.throughput {
        observers.push(Box::new(ThroughputMeter::with_clock(
            cfg.batch_size,
            clock.clone(),
        )?));
    }
    if cfg.profiler.enabled {
        let toggle = WindowedProfilerToggle::new(
            profiler,
            cfg.profiler.warmup_epochs,
            cfg.profiler.batches_to_profile,
        )
        .with_stop_on_train_end(cfg.profiler.stop_on_train_end);
        observers.push(Box::new(toggle));
    }

    Ok(observers)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    let cfg = match &args.config {
        Some(path) => HooksConfig::from_yaml(path)?.with_env_overrides()?,
        None => HooksConfig::from_env()?,
    };
    info!(?cfg, real_time = args.real_time, "configuration loaded");

    let shape = RunShape {
        epochs: cfg.epochs,
        batches_per_epoch: cfg.batches_per_epoch,
    };
    let mut profiler = TracingProfiler::new();

    if args.real_time {
        let mut observers = build_observers(&cfg, &SystemClock, &mut profiler)?;
        fit(&mut observers, shape, thread::sleep);
    } else {
        let clock = ManualClock::new();
        let mut observers = build_observers(&cfg, &clock, &mut profiler)?;
        fit(&mut observers, shape, |d| clock.advance(d));
    }

    let (starts, stops) = profiler.calls();
    info!(starts, stops, "run finished");
    Ok(())
}

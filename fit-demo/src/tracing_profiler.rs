//! Profiler stand-in that only logs.
//!
//! A real deployment would wrap the vendor profiler API here; the demo
//! records the calls so the profiling window is visible in the logs.

use tracing::info;
use train_hooks::ProfilerControl;

/// [`ProfilerControl`] logging every start/stop.
#[derive(Debug, Default)]
pub struct TracingProfiler {
    starts: usize,
    stops: usize,
}

impl TracingProfiler {
    /// Creates a profiler that has never been started.
    pub fn new() -> Self {
        Self::default()
    }

    /// `(starts, stops)` seen so far.
    pub fn calls(&self) -> (usize, usize) {
        (self.starts, self.stops)
    }
}

impl ProfilerControl for TracingProfiler {
    fn start(&mut self) {
        self.starts += 1;
        info!(target: "profiler", "capture started");
    }

    fn stop(&mut self) {
        self.stops += 1;
        info!(target: "profiler", "capture stopped");
    }
}

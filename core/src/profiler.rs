//! Windowed activation of a low-level hardware profiler.
//!
//! Profiler captures are large and repetitive, and the first epochs are
//! dominated by graph compilation. [`WindowedProfilerToggle`] therefore
//! skips `warmup_epochs` epochs, starts the profiler at the beginning of
//! the next one, and stops it once the batch index reaches
//! `batches_to_profile` or more than `batches_to_profile` batches have
//! ended since it was started, whichever comes first. The second bound
//! closes windows spanning epochs shorter than the limit.
//!
//! ```text
//!            on_epoch_begin(e == warmup)        on_batch_end(b >= limit || seen > limit)
//!   Idle ──────────────────────────────▶ Profiling ──────────────────────────────────▶ Finished
//! ```
//!
//! `Finished` is terminal for the run: the profiler is started and stopped
//! at most once each between two `on_train_begin` calls.

use tracing::{info, warn};

use crate::observer::{Logs, TrainingObserver};

/// Opaque start/stop capability of an external profiler.
pub trait ProfilerControl {
    /// Begins capturing.
    fn start(&mut self);

    /// Ends capturing and flushes the output.
    fn stop(&mut self);
}

/// No-op profiler, handy when profiling is configured off.
impl ProfilerControl for () {
    fn start(&mut self) {}

    fn stop(&mut self) {}
}

impl<P: ProfilerControl + ?Sized> ProfilerControl for &mut P {
    fn start(&mut self) {
        (**self).start();
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}

impl<P: ProfilerControl + ?Sized> ProfilerControl for Box<P> {
    fn start(&mut self) {
        (**self).start();
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}

/// Position of the toggle in its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilerState {
    /// Disabled, waiting for the warmup epoch.
    Idle,
    /// Enabled: the external profiler is capturing.
    Profiling,
    /// Disabled again; the window is over for this run.
    Finished,
}

impl ProfilerState {
    /// Returns `true` while the external profiler is capturing.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Profiling)
    }
}

/// Observer enabling a profiler for a bounded window of batches.
#[derive(Debug)]
pub struct WindowedProfilerToggle<P: ProfilerControl> {
    profiler: P,
    warmup_epochs: usize,
    batches_to_profile: Option<usize>,
    stop_on_train_end: bool,
    state: ProfilerState,
    batches_since_enable: usize,
}

impl<P: ProfilerControl> WindowedProfilerToggle<P> {
    /// Creates a toggle driving `profiler`.
    ///
    /// * `warmup_epochs`: index of the epoch whose beginning starts the
    ///   profiler (0 starts it with the first epoch);
    /// * `batches_to_profile`: batch index at which the profiler is
    ///   stopped, also the maximum number of profiled batches across
    ///   epochs; `None` leaves it running.
    pub fn new(profiler: P, warmup_epochs: usize, batches_to_profile: Option<usize>) -> Self {
        Self {
            profiler,
            warmup_epochs,
            batches_to_profile,
            stop_on_train_end: false,
            state: ProfilerState::Idle,
            batches_since_enable: 0,
        }
    }

    /// Also stop the profiler at train end if the window is still open.
    ///
    /// Off by default. Useful with `batches_to_profile = None`, where no
    /// batch ever closes the window.
    #[must_use]
    pub fn with_stop_on_train_end(mut self, stop: bool) -> Self {
        self.stop_on_train_end = stop;
        self
    }

    /// Current state.
    pub fn state(&self) -> ProfilerState {
        self.state
    }

    /// Returns `true` while the profiler is capturing.
    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Epoch index at which profiling starts.
    pub fn warmup_epochs(&self) -> usize {
        self.warmup_epochs
    }

    /// Batch index at which profiling stops, if any.
    pub fn batches_to_profile(&self) -> Option<usize> {
        self.batches_to_profile
    }

    /// Batches ended since the profiler was last started.
    pub fn batches_since_enable(&self) -> usize {
        self.batches_since_enable
    }

    /// Shared access to the wrapped profiler.
    pub fn profiler(&self) -> &P {
        &self.profiler
    }

    /// Consumes the toggle and returns the wrapped profiler.
    pub fn into_inner(self) -> P {
        self.profiler
    }

    fn disable(&mut self, reason: &'static str) {
        self.profiler.stop();
        self.state = ProfilerState::Finished;
        info!(reason, "profiler stopped");
    }
}

impl<P: ProfilerControl> TrainingObserver for WindowedProfilerToggle<P> {
    fn on_train_begin(&mut self, _logs: Option<&Logs>) {
        match self.state {
            ProfilerState::Profiling => {
                warn!("profiler still capturing from a previous run; window kept open");
            }
            ProfilerState::Finished | ProfilerState::Idle => self.state = ProfilerState::Idle,
        }
    }

    fn on_epoch_begin(&mut self, epoch: usize, _logs: Option<&Logs>) {
        if self.state == ProfilerState::Idle && epoch == self.warmup_epochs {
            self.profiler.start();
            self.state = ProfilerState::Profiling;
            self.batches_since_enable = 0;
            info!(epoch, batches_to_profile = ?self.batches_to_profile, "profiler started");
        }
    }

    fn on_batch_end(&mut self, batch: usize, _logs: Option<&Logs>) {
        if !self.state.is_enabled() {
            return;
        }
        self.batches_since_enable = self.batches_since_enable.saturating_add(1);
        let seen = self.batches_since_enable;
        if self
            .batches_to_profile
            .is_some_and(|limit| batch >= limit || seen > limit)
        {
            self.disable("batch window reached");
        }
    }

    fn on_train_end(&mut self, _logs: Option<&Logs>) {
        if self.stop_on_train_end && self.state.is_enabled() {
            self.disable("train end");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fake profiler counting calls.
    #[derive(Debug, Default)]
    struct CountingProfiler {
        starts: usize,
        stops: usize,
    }

    impl ProfilerControl for CountingProfiler {
        fn start(&mut self) {
            self.starts += 1;
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    /// Where (epoch, batch) the start and the stop happened.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Trace {
        start_at: Vec<(usize, Option<usize>)>,
        stop_at: Vec<(usize, Option<usize>)>,
    }

    fn run(
        toggle: &mut WindowedProfilerToggle<CountingProfiler>,
        epochs: usize,
        batches: usize,
    ) -> Trace {
        let mut trace = Trace::default();
        let mut seen = (0, 0);
        let mut note = |t: &WindowedProfilerToggle<CountingProfiler>,
                        trace: &mut Trace,
                        at: (usize, Option<usize>)| {
            let now = (t.profiler().starts, t.profiler().stops);
            if now.0 > seen.0 {
                trace.start_at.push(at);
            }
            if now.1 > seen.1 {
                trace.stop_at.push(at);
            }
            seen = now;
        };

        toggle.on_train_begin(None);
        for epoch in 0..epochs {
            toggle.on_epoch_begin(epoch, None);
            note(&*toggle, &mut trace, (epoch, None));
            for batch in 0..batches {
                toggle.on_batch_begin(batch, None);
                toggle.on_batch_end(batch, None);
                note(&*toggle, &mut trace, (epoch, Some(batch)));
            }
            toggle.on_epoch_end(epoch, None);
        }
        toggle.on_train_end(None);
        note(&*toggle, &mut trace, (epochs, None));
        trace
    }

    #[test]
    fn starts_exactly_at_the_warmup_epoch() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 2, Some(5));
        let trace = run(&mut toggle, 4, 8);

        assert_eq!(trace.start_at, vec![(2, None)]);
        assert_eq!(toggle.profiler().starts, 1);
    }

    #[test]
    fn stops_at_the_first_batch_reaching_the_limit() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 2, Some(5));
        let trace = run(&mut toggle, 4, 8);

        assert_eq!(trace.stop_at, vec![(2, Some(5))]);
        assert_eq!(toggle.profiler().stops, 1);
        assert_eq!(toggle.state(), ProfilerState::Finished);
    }

    #[test]
    fn short_epochs_still_close_the_window() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 0, Some(5));
        let trace = run(&mut toggle, 10, 3);

        // six batches ended: epoch 0 (0, 1, 2) and epoch 1 (0, 1, 2)
        assert_eq!(trace.start_at, vec![(0, None)]);
        assert_eq!(trace.stop_at, vec![(1, Some(2))]);
        assert_eq!(toggle.profiler().stops, 1);
        assert_eq!(toggle.state(), ProfilerState::Finished);
    }

    #[test]
    fn batch_counter_restarts_with_each_window() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 1, Some(3));
        run(&mut toggle, 3, 2);
        assert_eq!(toggle.batches_since_enable(), 4);

        toggle.on_train_begin(None);
        toggle.on_epoch_begin(1, None);
        assert_eq!(toggle.batches_since_enable(), 0);
        toggle.on_batch_end(0, None);
        assert_eq!(toggle.batches_since_enable(), 1);
        assert!(toggle.is_enabled());
    }

    #[test]
    fn unset_limit_keeps_profiling_until_the_end() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 1, None);
        let trace = run(&mut toggle, 3, 10);

        assert_eq!(trace.start_at, vec![(1, None)]);
        assert!(trace.stop_at.is_empty());
        assert_eq!(toggle.state(), ProfilerState::Profiling);
    }

    #[test]
    fn stop_on_train_end_closes_an_open_window() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 1, None)
            .with_stop_on_train_end(true);
        let trace = run(&mut toggle, 3, 10);

        assert_eq!(trace.stop_at, vec![(3, None)]);
        assert_eq!(toggle.profiler().stops, 1);
    }

    #[test]
    fn stop_on_train_end_does_not_stop_twice() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 0, Some(2))
            .with_stop_on_train_end(true);
        run(&mut toggle, 2, 4);

        assert_eq!(toggle.profiler().stops, 1);
    }

    #[test]
    fn never_starts_when_warmup_exceeds_the_run() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 10, Some(1));
        run(&mut toggle, 3, 4);

        let profiler = toggle.into_inner();
        assert_eq!(profiler.starts, 0);
        assert_eq!(profiler.stops, 0);
    }

    #[test]
    fn batches_before_enabling_do_not_stop() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 1, Some(0));
        toggle.on_train_begin(None);
        toggle.on_epoch_begin(0, None);
        toggle.on_batch_end(7, None);
        assert_eq!(toggle.profiler().stops, 0);
        assert_eq!(toggle.state(), ProfilerState::Idle);
    }

    #[test]
    fn a_new_run_reopens_the_window() {
        let mut toggle = WindowedProfilerToggle::new(CountingProfiler::default(), 0, Some(1));
        run(&mut toggle, 1, 3);
        run(&mut toggle, 1, 3);

        assert_eq!(toggle.profiler().starts, 2);
        assert_eq!(toggle.profiler().stops, 2);
    }

    #[test]
    fn boxed_profilers_are_accepted() {
        let mut counting = CountingProfiler::default();
        {
            let boxed: Box<dyn ProfilerControl + '_> = Box::new(&mut counting);
            let mut toggle = WindowedProfilerToggle::new(boxed, 0, Some(0));
            toggle.on_train_begin(None);
            toggle.on_epoch_begin(0, None);
            toggle.on_batch_end(0, None);
        }
        assert_eq!((counting.starts, counting.stops), (1, 1));
    }
}

//! Lifecycle contract between a training loop and its observers.
//!
//! The host loop drives every observer through the same fixed sequence:
//!
//! ```text
//! train_begin
//!   ├─ epoch_begin(e)
//!   │    ├─ batch_begin(b) → batch_end(b)   (× batches)
//!   │    └─ epoch_end(e)
//!   └─ ...                                   (× epochs)
//! train_end
//! ```
//!
//! Calls are synchronous and never overlap. Observers must not panic and
//! must not fail the loop: out-of-order calls are logged and ignored.

use std::collections::BTreeMap;

/// Metrics mapping the host may pass along with a lifecycle event
/// (loss, accuracy, ...). None of the built-in observers read it.
pub type Logs = BTreeMap<String, f64>;

/// Observer attached to a training loop.
///
/// Every method has an empty default body, so an implementation only
/// overrides the events it cares about.
pub trait TrainingObserver {
    /// Training is about to start.
    fn on_train_begin(&mut self, _logs: Option<&Logs>) {}

    /// Epoch `epoch` (0-based) is about to start.
    fn on_epoch_begin(&mut self, _epoch: usize, _logs: Option<&Logs>) {}

    /// Batch `batch` (0-based, within the current epoch) is about to start.
    fn on_batch_begin(&mut self, _batch: usize, _logs: Option<&Logs>) {}

    /// Batch `batch` has finished.
    fn on_batch_end(&mut self, _batch: usize, _logs: Option<&Logs>) {}

    /// Epoch `epoch` has finished.
    fn on_epoch_end(&mut self, _epoch: usize, _logs: Option<&Logs>) {}

    /// Training has finished.
    fn on_train_end(&mut self, _logs: Option<&Logs>) {}
}

impl TrainingObserver for () {}

impl<T: TrainingObserver + ?Sized> TrainingObserver for &mut T {
    fn on_train_begin(&mut self, logs: Option<&Logs>) {
        (**self).on_train_begin(logs);
    }

    fn on_epoch_begin(&mut self, epoch: usize, logs: Option<&Logs>) {
        (**self).on_epoch_begin(epoch, logs);
    }

    fn on_batch_begin(&mut self, batch: usize, logs: Option<&Logs>) {
        (**self).on_batch_begin(batch, logs);
    }

    fn on_batch_end(&mut self, batch: usize, logs: Option<&Logs>) {
        (**self).on_batch_end(batch, logs);
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: Option<&Logs>) {
        (**self).on_epoch_end(epoch, logs);
    }

    fn on_train_end(&mut self, logs: Option<&Logs>) {
        (**self).on_train_end(logs);
    }
}

impl<T: TrainingObserver + ?Sized> TrainingObserver for Box<T> {
    fn on_train_begin(&mut self, logs: Option<&Logs>) {
        (**self).on_train_begin(logs);
    }

    fn on_epoch_begin(&mut self, epoch: usize, logs: Option<&Logs>) {
        (**self).on_epoch_begin(epoch, logs);
    }

    fn on_batch_begin(&mut self, batch: usize, logs: Option<&Logs>) {
        (**self).on_batch_begin(batch, logs);
    }

    fn on_batch_end(&mut self, batch: usize, logs: Option<&Logs>) {
        (**self).on_batch_end(batch, logs);
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: Option<&Logs>) {
        (**self).on_epoch_end(epoch, logs);
    }

    fn on_train_end(&mut self, logs: Option<&Logs>) {
        (**self).on_train_end(logs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Observer that writes down every event it receives.
    #[derive(Debug, Default)]
    struct EventLog {
        events: Vec<String>,
    }

    impl TrainingObserver for EventLog {
        fn on_epoch_begin(&mut self, epoch: usize, _logs: Option<&Logs>) {
            self.events.push(format!("epoch_begin {epoch}"));
        }

        fn on_batch_end(&mut self, batch: usize, logs: Option<&Logs>) {
            let loss = logs.and_then(|l| l.get("loss")).copied();
            self.events.push(format!("batch_end {batch} {loss:?}"));
        }
    }

    fn drive(observer: &mut dyn TrainingObserver) {
        let mut logs = Logs::new();
        logs.insert("loss".to_string(), 0.5);

        observer.on_train_begin(None);
        observer.on_epoch_begin(0, None);
        observer.on_batch_begin(0, None);
        observer.on_batch_end(0, Some(&logs));
        observer.on_epoch_end(0, None);
        observer.on_train_end(None);
    }

    #[test]
    fn default_methods_are_no_ops() {
        let mut log = EventLog::default();
        drive(&mut log);
        assert_eq!(log.events, vec!["epoch_begin 0", "batch_end 0 Some(0.5)"]);
    }

    #[test]
    fn boxed_observers_forward_events() {
        let mut log = EventLog::default();
        {
            let mut observers: Vec<Box<dyn TrainingObserver + '_>> =
                vec![Box::new(()), Box::new(&mut log)];
            for observer in &mut observers {
                drive(observer);
            }
        }
        assert_eq!(log.events, vec!["epoch_begin 0", "batch_end 0 Some(0.5)"]);
    }

    #[test]
    fn borrowed_observers_forward_events() {
        let mut log = EventLog::default();
        {
            let mut borrowed = &mut log;
            drive(&mut borrowed);
        }
        assert_eq!(log.events.len(), 2);
    }
}

//! Simulated host training loop.
//!
//! Stands in for a real framework: it performs no computation, it only
//! calls the observers in lifecycle order and lets the caller spend time
//! for each batch.

use std::time::Duration;

use train_hooks::{Logs, TrainingObserver};

/// Shape of the simulated run.
#[derive(Debug, Clone, Copy)]
pub struct RunShape {
    /// Number of epochs.
    pub epochs: usize,
    /// Batches per epoch.
    pub batches_per_epoch: usize,
}

/// Drives `observers` through a full run.
///
/// `spend` is called between `on_batch_begin` and `on_batch_end` with the
/// simulated duration of the batch.
pub fn fit<F>(observers: &mut [Box<dyn TrainingObserver + '_>], shape: RunShape, mut spend: F)
where
    F: FnMut(Duration),
{
    let mut logs = Logs::new();

    for observer in observers.iter_mut() {
        observer.on_train_begin(None);
    }

    for epoch in 0..shape.epochs {
        for observer in observers.iter_mut() {
            observer.on_epoch_begin(epoch, None);
        }

        for batch in 0..shape.batches_per_epoch {
            for observer in observers.iter_mut() {
                observer.on_batch_begin(batch, None);
            }

            spend(batch_duration(epoch, batch));
            logs.insert("loss".to_string(), simulated_loss(epoch, batch));

            for observer in observers.iter_mut() {
                observer.on_batch_end(batch, Some(&logs));
            }
        }

        for observer in observers.iter_mut() {
            observer.on_epoch_end(epoch, Some(&logs));
        }
    }

    for observer in observers.iter_mut() {
        observer.on_train_end(Some(&logs));
    }
}

/// Simulated batch latency: the very first batch pays for graph
/// compilation, the rest jitter around 20ms.
pub fn batch_duration(epoch: usize, batch: usize) -> Duration {
    if epoch == 0 && batch == 0 {
        return Duration::from_millis(250);
    }
    let jitter = u64::try_from((epoch * 31 + batch * 7) % 9).unwrap_or(0);
    Duration::from_millis(20 + jitter)
}

#[allow(clippy::cast_precision_loss)]
fn simulated_loss(epoch: usize, batch: usize) -> f64 {
    let step = (epoch * 1_000 + batch) as f64;
    1.0 / (1.0 + step / 50.0)
}

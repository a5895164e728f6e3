//! Robust statistics over sample sequences.
//!
//! Timing data is noisy (first-batch graph compilation, I/O stalls), so
//! summaries use the median rather than the mean.

/// Median of `samples`, or `None` when the slice is empty.
///
/// Odd length: the middle element of the sorted samples. Even length: the
/// mean of the two middle elements. NaNs sort after every other value
/// (`f64::total_cmp`), so they never panic the sort.
#[must_use]
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Sum of `samples`, accumulated left to right.
///
/// The order is fixed so that an epoch total is bit-identical to summing
/// the same batch times by hand.
#[must_use]
pub fn sum(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0, |acc, &x| acc + x)
}

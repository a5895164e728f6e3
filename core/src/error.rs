//! Typed errors for the training hooks.
//!
//! Lifecycle methods never surface these to the host loop: they are
//! returned by constructors, configuration loading and the summary
//! accessors, where the caller can decide what to do with them.

use thiserror::Error;

/// Errors produced by observer construction, summaries and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A throughput meter was built with a batch size of zero.
    #[error("batch size must be > 0, got {0}")]
    InvalidBatchSize(usize),

    /// An epoch ended without any recorded batch.
    #[error("epoch {epoch} ended with no recorded batches")]
    EmptyEpoch {
        /// Index of the offending epoch.
        epoch: usize,
    },

    /// A summary was requested before any sample was recorded.
    #[error("no samples recorded for {what}")]
    NoSamples {
        /// Which accumulator was empty.
        what: &'static str,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Shorthand for results carrying a [`HookError`].
pub type HookResult<T> = Result<T, HookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            HookError::InvalidBatchSize(0).to_string(),
            "batch size must be > 0, got 0"
        );
        assert_eq!(
            HookError::EmptyEpoch { epoch: 3 }.to_string(),
            "epoch 3 ended with no recorded batches"
        );
        assert_eq!(
            HookError::NoSamples { what: "epoch times" }.to_string(),
            "no samples recorded for epoch times"
        );
    }
}

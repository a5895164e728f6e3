//! Configuration for the training hooks.
//!
//! Settings come from a YAML file, from environment variables, or both
//! (environment overrides file). Every field has a default, so an empty
//! file or an empty environment is a valid configuration.
//!
//! Recognised variables (the `HOOKS_` prefix is accepted as an alias of
//! `TRAIN_HOOKS_`; the first one defined wins):
//!
//! | variable                                   | field                            |
//! |--------------------------------------------|----------------------------------|
//! | `TRAIN_HOOKS_BATCH_SIZE`                   | `batch_size`                     |
//! | `TRAIN_HOOKS_EPOCHS`                       | `epochs`                         |
//! | `TRAIN_HOOKS_BATCHES_PER_EPOCH`            | `batches_per_epoch`              |
//! | `TRAIN_HOOKS_TIMING`                       | `timing`                         |
//! | `TRAIN_HOOKS_THROUGHPUT`                   | `throughput`                     |
//! | `TRAIN_HOOKS_PROFILE`                      | `profiler.enabled`               |
//! | `TRAIN_HOOKS_WARMUP_EPOCHS`                | `profiler.warmup_epochs`         |
//! | `TRAIN_HOOKS_BATCHES_TO_PROFILE`           | `profiler.batches_to_profile`    |
//! | `TRAIN_HOOKS_PROFILE_STOP_ON_TRAIN_END`    | `profiler.stop_on_train_end`     |

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{HookError, HookResult};

/// Primary and legacy prefixes for environment variables.
const ENV_PREFIXES: [&str; 2] = ["TRAIN_HOOKS_", "HOOKS_"];

/// Which observers to attach and how.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Samples per batch, used by the throughput meter.
    pub batch_size: usize,
    /// Epochs run by a simulated host loop.
    pub epochs: usize,
    /// Batches per epoch run by a simulated host loop.
    pub batches_per_epoch: usize,
    /// Attach the batch/epoch timer.
    pub timing: bool,
    /// Attach the throughput meter.
    pub throughput: bool,
    /// Profiler window settings.
    pub profiler: ProfilerWindowConfig,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            epochs: 3,
            batches_per_epoch: 10,
            timing: true,
            throughput: true,
            profiler: ProfilerWindowConfig::default(),
        }
    }
}

/// Settings of the windowed profiler toggle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ProfilerWindowConfig {
    /// Attach the profiler toggle at all.
    pub enabled: bool,
    /// Epoch index at which profiling starts.
    pub warmup_epochs: usize,
    /// Batch index at which profiling stops; unset keeps it running.
    pub batches_to_profile: Option<usize>,
    /// Stop a still-open window at train end.
    pub stop_on_train_end: bool,
}

impl HooksConfig {
    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or on values rejected by [`Self::validate`].
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw).context("Invalid hooks configuration YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads a YAML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read hooks configuration {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    /// Builds a configuration from defaults and environment variables.
    ///
    /// # Errors
    ///
    /// Fails on unparsable numbers or out-of-range values.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Applies environment variables on top of `self`.
    ///
    /// # Errors
    ///
    /// Fails on unparsable numbers or out-of-range values.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(value) = env_usize("BATCH_SIZE")? {
            self.batch_size = value;
        }
        if let Some(value) = env_usize("EPOCHS")? {
            self.epochs = value;
        }
        if let Some(value) = env_usize("BATCHES_PER_EPOCH")? {
            self.batches_per_epoch = value;
        }
        if let Some(raw) = first_env("TIMING") {
            self.timing = parse_bool(&raw);
        }
        if let Some(raw) = first_env("THROUGHPUT") {
            self.throughput = parse_bool(&raw);
        }
        if let Some(raw) = first_env("PROFILE") {
            self.profiler.enabled = parse_bool(&raw);
        }
        if let Some(value) = env_usize("WARMUP_EPOCHS")? {
            self.profiler.warmup_epochs = value;
        }
        if let Some(value) = env_usize("BATCHES_TO_PROFILE")? {
            self.profiler.batches_to_profile = Some(value);
        }
        if let Some(raw) = first_env("PROFILE_STOP_ON_TRAIN_END") {
            self.profiler.stop_on_train_end = parse_bool(&raw);
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`HookError::InvalidConfig`] when `batch_size` is zero or
    /// `profiler.batches_to_profile` is set to zero.
    pub fn validate(&self) -> HookResult<()> {
        if self.batch_size == 0 {
            return Err(HookError::InvalidConfig(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.profiler.batches_to_profile == Some(0) {
            return Err(HookError::InvalidConfig(
                "profiler.batches_to_profile must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the first defined `<prefix><suffix>` variable.
fn first_env(suffix: &str) -> Option<String> {
    ENV_PREFIXES
        .iter()
        .find_map(|prefix| env::var(format!("{prefix}{suffix}")).ok())
}

/// Reads an optional non-negative integer variable.
fn env_usize(suffix: &str) -> Result<Option<usize>> {
    first_env(suffix)
        .map(|raw| {
            raw.trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid value for {suffix}: {raw}"))
        })
        .transpose()
}

/// Loose boolean: `1`, `true`, `yes`, `on` (any case) are true, anything
/// else is false.
fn parse_bool(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "yes" | "on")
}

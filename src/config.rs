use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
};

use partitioner::{DEFAULT_MARGIN, PartitionMode};
use sieve::DEFAULT_BATCH_SIZE;

use crate::error::ConfigError;

pub const MIN_LAST_NUMBER: u64 = 50_000;
pub const MAX_LAST_NUMBER: u64 = 1_000_000_000;
pub const DEFAULT_BUFFER_NAME: &str = "shared_memory_array";
pub const DEFAULT_STORE_PATH: &str = "primes.jsonl";

/// Immutable settings of one run, built once and handed to the `Orchestrator`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    mode: PartitionMode,
    last_number: u64,
    workers: NonZeroUsize,
    margin: f64,
    batch_size: NonZeroUsize,
    buffer_name: String,
    sample: usize,
    store: PathBuf,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    pub fn mode(&self) -> PartitionMode {
        self.mode
    }

    /// Inclusive upper bound of the search.
    pub fn last_number(&self) -> u64 {
        self.last_number
    }

    /// Requested workers, before clamping to the available parallelism.
    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    pub fn buffer_name(&self) -> &str {
        &self.buffer_name
    }

    /// How many random primes to report after the sieve, `0` disables it.
    pub fn sample(&self) -> usize {
        self.sample
    }

    pub fn store(&self) -> &Path {
        &self.store
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: PartitionMode::default(),
            last_number: MAX_LAST_NUMBER,
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            margin: DEFAULT_MARGIN,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            buffer_name: DEFAULT_BUFFER_NAME.to_string(),
            sample: 0,
            store: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

/// Collects optional overrides and validates them all in `build`.
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    mode: Option<PartitionMode>,
    last_number: Option<u64>,
    workers: Option<usize>,
    margin: Option<f64>,
    batch_size: Option<usize>,
    buffer_name: Option<String>,
    sample: Option<usize>,
    store: Option<PathBuf>,
}

impl RunConfigBuilder {
    pub fn mode(mut self, mode: PartitionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn last_number(mut self, last_number: u64) -> Self {
        self.last_number = Some(last_number);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn buffer_name(mut self, name: impl Into<String>) -> Self {
        self.buffer_name = Some(name.into());
        self
    }

    pub fn sample(mut self, sample: usize) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn store(mut self, path: impl Into<PathBuf>) -> Self {
        self.store = Some(path.into());
        self
    }

    /// Validates the overrides on top of the defaults.
    ///
    /// # Errors
    /// A `ConfigError` for the first invalid setting, the last number must lie
    /// in `[MIN_LAST_NUMBER, MAX_LAST_NUMBER]`.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let mut config = RunConfig::default();

        if let Some(last) = self.last_number {
            if last < MIN_LAST_NUMBER {
                return Err(ConfigError::BoundTooSmall {
                    got: last,
                    min: MIN_LAST_NUMBER,
                });
            }
            if last > MAX_LAST_NUMBER {
                return Err(ConfigError::BoundTooLarge {
                    got: last,
                    max: MAX_LAST_NUMBER,
                });
            }
            config.last_number = last;
        }

        if let Some(workers) = self.workers {
            config.workers = NonZeroUsize::new(workers).ok_or(ConfigError::InvalidWorkers)?;
        }

        if let Some(margin) = self.margin {
            if !margin.is_finite() || margin < 1.0 {
                return Err(ConfigError::InvalidMargin(margin));
            }
            config.margin = margin;
        }

        if let Some(size) = self.batch_size {
            config.batch_size = NonZeroUsize::new(size).ok_or(ConfigError::InvalidBatchSize)?;
        }

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(name) = self.buffer_name {
            config.buffer_name = name;
        }
        if let Some(sample) = self.sample {
            config.sample = sample;
        }
        if let Some(store) = self.store {
            config.store = store;
        }

        Ok(config)
    }
}

use std::{error::Error, fmt, io};

use partitioner::PartitionError;
use sieve::SieveError;
use tokio::task::JoinError;

/// The orchestrator's result type.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Invalid user input, reported before any computation starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    BoundTooSmall { got: u64, min: u64 },
    BoundTooLarge { got: u64, max: u64 },
    InvalidNumber { flag: String, value: String },
    InvalidMargin(f64),
    InvalidBatchSize,
    InvalidWorkers,
    MissingValue(String),
    UnknownFlag(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundTooSmall { got, min } => {
                write!(f, "the given last number {got} cannot be lesser than {min}")
            }
            Self::BoundTooLarge { got, max } => {
                write!(f, "the given last number {got} cannot be greater than {max}")
            }
            Self::InvalidNumber { flag, value } => {
                write!(f, "invalid value for {flag}: {value:?}")
            }
            Self::InvalidMargin(m) => write!(f, "the safety margin must be at least 1.0, got {m}"),
            Self::InvalidBatchSize => f.write_str("the batch size must be greater than zero"),
            Self::InvalidWorkers => f.write_str("the worker count must be greater than zero"),
            Self::MissingValue(flag) => write!(f, "missing value for {flag}"),
            Self::UnknownFlag(flag) => write!(f, "unknown argument {flag}"),
        }
    }
}

impl Error for ConfigError {}

/// All errors that can stop a run.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before computing anything.
    Config(ConfigError),
    /// The search space couldn't be partitioned.
    Partition(PartitionError),
    /// The seed doesn't reach `sqrt(last)`, results would be wrong.
    SeedTooShort { largest: Option<u64>, last: u64 },
    /// A worker didn't complete its row.
    WorkerFailure { worker: usize, msg: String },
    /// Any other failure of the sieve phase.
    Sieve(SieveError),
    /// The blocking sieve task was cancelled or panicked outside a worker.
    Join(JoinError),
    /// Reading the seed or persisting results failed.
    Persistence(io::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid config: {e}"),
            Self::Partition(e) => write!(f, "partition error: {e}"),
            Self::SeedTooShort { largest, last } => match largest {
                Some(p) => write!(f, "known primes end at {p}, too short to test up to {last}"),
                None => write!(f, "no known primes, cannot test up to {last}"),
            },
            Self::WorkerFailure { worker, msg } => write!(f, "worker {worker} failed: {msg}"),
            Self::Sieve(e) => write!(f, "sieve error: {e}"),
            Self::Join(e) => write!(f, "sieve task error: {e}"),
            Self::Persistence(e) => write!(f, "persistence error: {e}"),
        }
    }
}

impl Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Partition(e) => Some(e),
            Self::Sieve(e) => Some(e),
            Self::Join(e) => Some(e),
            Self::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for OrchestratorError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<PartitionError> for OrchestratorError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

impl From<SieveError> for OrchestratorError {
    fn from(e: SieveError) -> Self {
        match e {
            SieveError::WorkerPanicked { worker, msg } => Self::WorkerFailure { worker, msg },
            SieveError::RowOverflow { row, .. } => Self::WorkerFailure {
                worker: row,
                msg: e.to_string(),
            },
            other => Self::Sieve(other),
        }
    }
}

impl From<JoinError> for OrchestratorError {
    fn from(e: JoinError) -> Self {
        Self::Join(e)
    }
}

impl From<io::Error> for OrchestratorError {
    fn from(e: io::Error) -> Self {
        Self::Persistence(e)
    }
}

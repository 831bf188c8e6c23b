use std::{error::Error, fmt};

/// The sieve module's result type.
pub type Result<T> = std::result::Result<T, SieveError>;

/// Failures of the parallel sieve phase and of reading its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SieveError {
    /// A worker found more primes than its row can hold.
    RowOverflow { row: usize, capacity: usize },
    /// A value doesn't fit a positive 32 bit cell.
    ValueOutOfRange { row: usize, value: u64 },
    /// A row was never marked complete, its worker didn't finish.
    UnsealedRow { row: usize },
    /// The buffer and the plan disagree on the amount of workers.
    PlanMismatch { rows: usize, assignments: usize },
    /// The seed isn't strictly ascending or holds a value below 3.
    UnsortedSeed { index: usize },
    /// A buffer needs at least one row and one slot per row.
    EmptyBuffer { rows: usize, row_capacity: usize },
    /// A worker panicked mid sieve.
    WorkerPanicked { worker: usize, msg: String },
    /// The thread pool couldn't be created.
    Pool(String),
}

impl fmt::Display for SieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowOverflow { row, capacity } => {
                write!(f, "row {row} overflowed its capacity of {capacity}")
            }
            Self::ValueOutOfRange { row, value } => {
                write!(f, "value {value} for row {row} doesn't fit a buffer cell")
            }
            Self::UnsealedRow { row } => write!(f, "row {row} was never completed"),
            Self::PlanMismatch { rows, assignments } => write!(
                f,
                "buffer has {rows} rows but the plan has {assignments} assignments"
            ),
            Self::UnsortedSeed { index } => {
                write!(f, "seed is not an ascending list of odd primes at index {index}")
            }
            Self::EmptyBuffer { rows, row_capacity } => {
                write!(f, "cannot allocate a {rows}x{row_capacity} buffer")
            }
            Self::WorkerPanicked { worker, msg } => write!(f, "worker {worker} panicked: {msg}"),
            Self::Pool(msg) => write!(f, "thread pool error: {msg}"),
        }
    }
}

impl Error for SieveError {}

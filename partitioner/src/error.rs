use std::{error::Error, fmt};

/// The partitioner's result type.
pub type Result<T> = std::result::Result<T, PartitionError>;

/// Degenerate inputs detected while building a `PartitionPlan`.
///
/// None of these are retried, a plan either exists or the run stops.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionError {
    /// Zero workers were requested.
    InvalidWorkers(usize),
    /// `first > last`, there is nothing to partition.
    EmptyRange { first: u64, last: u64 },
    /// The cost model produced `NaN`, an infinity or a negative total.
    NonFiniteCost { a: u64, b: u64 },
    /// The boundary search exceeded its step budget.
    NonConvergent { start: u64, target: f64 },
    /// Safety margins must be finite and at least `1.0`.
    InvalidMargin(f64),
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWorkers(n) => write!(f, "invalid worker count: {n}"),
            Self::EmptyRange { first, last } => {
                write!(f, "empty range: first {first} is past last {last}")
            }
            Self::NonFiniteCost { a, b } => {
                write!(f, "cost model returned a non finite value for [{a}, {b}]")
            }
            Self::NonConvergent { start, target } => write!(
                f,
                "boundary search starting at {start} did not converge (target cost {target})"
            ),
            Self::InvalidMargin(m) => write!(f, "invalid safety margin: {m}"),
        }
    }
}

impl Error for PartitionError {}

use std::{iter::StepBy, ops::RangeInclusive};

/// Lazily generated odd candidates of one assignment.
pub type Candidates = StepBy<RangeInclusive<u64>>;

/// How the candidate space is split among workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionMode {
    /// Contiguous ranges with equal estimated cost. Rows come out globally sorted.
    #[default]
    Balanced,
    /// Every worker takes every `workers`-th odd number. Rows interleave.
    Striped,
}

/// An inclusive range of numbers owned by one worker.
///
/// A segment with `start > end` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
}

impl Segment {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Odd numbers `>= 3` inside the segment, ascending.
    pub fn candidates(&self) -> Candidates {
        let from = first_odd(self.start.max(3));
        (from..=self.end).step_by(2)
    }

    fn candidate_count(&self) -> u64 {
        let from = first_odd(self.start.max(3));
        if from > self.end {
            0
        } else {
            (self.end - from) / 2 + 1
        }
    }
}

/// An arithmetic progression `start, start + step, ...` bounded by `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stride {
    pub start: u64,
    pub step: u64,
    pub last: u64,
}

impl Stride {
    pub fn candidates(&self) -> Candidates {
        (self.start..=self.last).step_by(self.step as usize)
    }

    fn candidate_count(&self) -> u64 {
        if self.start > self.last {
            0
        } else {
            (self.last - self.start) / self.step + 1
        }
    }
}

/// The share of the candidate space given to a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Range(Segment),
    Stride(Stride),
}

impl Assignment {
    /// Returns the candidates of this assignment in ascending order.
    pub fn candidates(&self) -> Candidates {
        match self {
            Self::Range(segment) => segment.candidates(),
            Self::Stride(stride) => stride.candidates(),
        }
    }

    /// Returns how many candidates `candidates` yields, without iterating.
    pub fn candidate_count(&self) -> u64 {
        match self {
            Self::Range(segment) => segment.candidate_count(),
            Self::Stride(stride) => stride.candidate_count(),
        }
    }
}

/// The immutable result of partitioning `[first, last]` among the workers.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionPlan {
    mode: PartitionMode,
    first: u64,
    last: u64,
    assignments: Vec<Assignment>,
    row_capacity: usize,
}

impl PartitionPlan {
    /// Assembles a plan from explicit assignments.
    ///
    /// `RangePartitioner` is the usual way to get one, this exists for
    /// hand built plans.
    pub fn new(
        mode: PartitionMode,
        first: u64,
        last: u64,
        assignments: Vec<Assignment>,
        row_capacity: usize,
    ) -> Self {
        Self {
            mode,
            first,
            last,
            assignments,
            row_capacity,
        }
    }

    pub fn mode(&self) -> PartitionMode {
        self.mode
    }

    pub fn first(&self) -> u64 {
        self.first
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    /// The amount of workers, one per assignment.
    pub fn workers(&self) -> usize {
        self.assignments.len()
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Slots reserved per buffer row, chosen once before allocation.
    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }

    /// Whether concatenating worker outputs in row order yields ascending numbers.
    pub fn is_globally_ordered(&self) -> bool {
        self.mode == PartitionMode::Balanced
    }
}

pub(crate) fn first_odd(n: u64) -> u64 {
    n | 1
}

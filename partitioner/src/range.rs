use std::{num::NonZeroUsize, thread};

use log::{debug, info};

use crate::{
    cost::{CostModel, LogIntegral},
    error::{PartitionError, Result},
    plan::{Assignment, PartitionMode, PartitionPlan, Segment, Stride, first_odd},
};

/// Default over-provisioning applied to estimated prime counts.
pub const DEFAULT_MARGIN: f64 = 1.05;

/// Lower bound on row capacity, small ranges are where `li` is least accurate.
pub const MIN_ROW_CAPACITY: usize = 32;

/// Standard deviations of per row prime count variation reserved on top of
/// the estimate, before the margin is applied.
pub const VARIATION_SIGMAS: f64 = 3.0;

/// A binary search over `u64` never needs more than 64 halvings.
const MAX_SEARCH_STEPS: usize = 128;

/// Clamps a requested worker count into `[2, available]`.
///
/// The lower bound wins when `available < 2`.
pub fn clamp_workers(requested: usize, available: usize) -> usize {
    requested.min(available).max(2)
}

/// Slots needed to hold `expected` values with the given safety margin.
///
/// # Arguments
/// * `expected` - Estimated amount of values.
/// * `margin` - Multiplicative safety margin, `1.05` reserves 5% extra.
///
/// # Returns
/// `round(expected * margin)`.
pub fn row_capacity(expected: f64, margin: f64) -> usize {
    (expected.max(0.0) * margin).round() as usize
}

/// Pads an expected prime count with `VARIATION_SIGMAS * sqrt(expected)`.
///
/// The count of primes in one row spreads by about `sqrt(expected)`.
pub fn with_variation(expected: f64) -> f64 {
    let expected = expected.max(0.0);
    expected + VARIATION_SIGMAS * expected.sqrt()
}

/// Splits `[first, last]` among a fixed amount of workers.
#[derive(Debug, Clone)]
pub struct RangePartitioner<C = LogIntegral> {
    model: C,
    workers: usize,
    first: u64,
    last: u64,
    margin: f64,
}

impl RangePartitioner<LogIntegral> {
    /// Creates a partitioner using the logarithmic-integral cost model.
    ///
    /// The worker count is clamped into `[2, available_parallelism]`.
    ///
    /// # Arguments
    /// * `workers` - The requested amount of workers.
    /// * `first` - First number of the search space.
    /// * `last` - Last number of the search space, inclusive.
    ///
    /// # Errors
    /// `EmptyRange` if `first > last`.
    pub fn new(workers: usize, first: u64, last: u64) -> Result<Self> {
        let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::with_model(LogIntegral, clamp_workers(workers, available), first, last)
    }
}

impl<C: CostModel> RangePartitioner<C> {
    /// Creates a partitioner with an arbitrary cost model and an exact worker count.
    ///
    /// # Errors
    /// `InvalidWorkers` if `workers == 0`, `EmptyRange` if `first > last`.
    pub fn with_model(model: C, workers: usize, first: u64, last: u64) -> Result<Self> {
        if workers == 0 {
            return Err(PartitionError::InvalidWorkers(workers));
        }

        if first > last {
            return Err(PartitionError::EmptyRange { first, last });
        }

        Ok(Self {
            model,
            workers,
            first,
            last,
            margin: DEFAULT_MARGIN,
        })
    }

    /// Replaces the row capacity safety margin.
    ///
    /// # Errors
    /// `InvalidMargin` unless `margin` is finite and `>= 1.0`.
    pub fn margin(mut self, margin: f64) -> Result<Self> {
        if !margin.is_finite() || margin < 1.0 {
            return Err(PartitionError::InvalidMargin(margin));
        }

        self.margin = margin;
        Ok(self)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Builds the plan for the given mode.
    pub fn plan(&self, mode: PartitionMode) -> Result<PartitionPlan> {
        let plan = match mode {
            PartitionMode::Balanced => self.balanced()?,
            PartitionMode::Striped => self.striped()?,
        };

        info!(
            workers = plan.workers(),
            first = self.first,
            last = self.last,
            row_capacity = plan.row_capacity();
            "{mode:?} partition plan ready"
        );

        Ok(plan)
    }

    /// Splits the range into contiguous segments of equal estimated cost.
    ///
    /// Each boundary is found by binary search and rounded up to an even
    /// number so every segment after the first starts on an odd number.
    /// The last worker takes whatever is left up to `last`.
    pub fn balanced(&self) -> Result<PartitionPlan> {
        let total = self.model.cost(self.first, self.last);
        if !total.is_finite() || total < 0.0 {
            return Err(PartitionError::NonFiniteCost {
                a: self.first,
                b: self.last,
            });
        }

        let target = total / self.workers as f64;
        let mut assignments = Vec::with_capacity(self.workers);
        let mut start = self.first;

        for worker in 0..self.workers - 1 {
            let end = if start > self.last {
                self.last
            } else {
                self.boundary(start, target)?
            };

            debug!(worker = worker, start = start, end = end; "segment boundary found");
            assignments.push(Assignment::Range(Segment::new(start, end)));
            start = end + 1;
        }

        assignments.push(Assignment::Range(Segment::new(start, self.last)));

        let expected = assignments
            .iter()
            .filter_map(|a| match a {
                Assignment::Range(s) if !s.is_empty() => Some(self.model.prime_count(s.start, s.end)),
                _ => None,
            })
            .fold(0.0, f64::max);

        let capacity = row_capacity(with_variation(expected), self.margin).max(MIN_ROW_CAPACITY);

        Ok(PartitionPlan::new(
            PartitionMode::Balanced,
            self.first,
            self.last,
            assignments,
            capacity,
        ))
    }

    /// Deals odd numbers round-robin: worker `i` starts at `first + 2i` and
    /// advances by `2 * workers`.
    ///
    /// Rows only hold primes from residue classes coprime to `2 * workers`
    /// (plus the few primes dividing it), so the expected count is spread
    /// over those rows only.
    pub fn striped(&self) -> Result<PartitionPlan> {
        let base = first_odd(self.first.max(3));
        let step = 2 * self.workers as u64;

        let assignments: Vec<_> = (0..self.workers as u64)
            .map(|i| {
                Assignment::Stride(Stride {
                    start: base + 2 * i,
                    step,
                    last: self.last,
                })
            })
            .collect();

        let live = (0..self.workers as u64)
            .filter(|i| gcd((base + 2 * i) % step, step) == 1)
            .count()
            .max(1);

        let total = self.model.prime_count(self.first, self.last);
        if !total.is_finite() {
            return Err(PartitionError::NonFiniteCost {
                a: self.first,
                b: self.last,
            });
        }

        let capacity =
            row_capacity(with_variation(total / live as f64), self.margin).max(MIN_ROW_CAPACITY);

        Ok(PartitionPlan::new(
            PartitionMode::Striped,
            self.first,
            self.last,
            assignments,
            capacity,
        ))
    }

    /// Finds the end of the segment starting at `start` whose cost reaches `target`.
    ///
    /// Only probes numbers inside `[start, last]`.
    fn boundary(&self, start: u64, target: f64) -> Result<u64> {
        let mut low = start;
        let mut high = self.last;
        let mut steps = 0;

        while low <= high {
            steps += 1;
            if steps > MAX_SEARCH_STEPS {
                return Err(PartitionError::NonConvergent { start, target });
            }

            let mid = low + (high - low) / 2;
            let cost = self.model.cost(start, mid);
            if !cost.is_finite() {
                return Err(PartitionError::NonFiniteCost { a: start, b: mid });
            }

            if cost <= target {
                low = mid + 1;
            } else if mid == start {
                break;
            } else {
                high = mid - 1;
            }
        }

        let boundary = if low % 2 == 1 { low + 1 } else { low };
        Ok(boundary.min(self.last))
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

use std::time::{Duration, Instant};

use log::info;
use partitioner::Assignment;

use crate::{buffer::RowWriter, error::Result, known::KnownPrimes};

/// Decides primality of `n` by trial division against `seed`.
///
/// Only seed primes `p <= floor(sqrt(n))` are tried, stopping at the first
/// divisor. `seed` must hold every odd prime up to `floor(sqrt(n))`.
pub fn is_prime(n: u64, seed: &[u64]) -> bool {
    if n < 3 || n % 2 == 0 {
        return n == 2;
    }

    let limit = n.isqrt();
    seed.iter()
        .take_while(|&&p| p <= limit)
        .all(|&p| n % p != 0)
}

/// Per worker summary, advisory only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub candidates: u64,
    pub primes: u64,
    pub elapsed: Duration,
}

/// Tests every candidate of one assignment and records the primes in its row.
#[derive(Debug, Clone)]
pub struct SieveWorker<'a> {
    index: usize,
    assignment: Assignment,
    seed: &'a KnownPrimes,
}

impl<'a> SieveWorker<'a> {
    pub fn new(index: usize, assignment: Assignment, seed: &'a KnownPrimes) -> Self {
        Self {
            index,
            assignment,
            seed,
        }
    }

    /// Runs the sieve over the whole assignment.
    ///
    /// Primes are appended left to right in ascending order and the row is
    /// sealed only after the last candidate was tested.
    ///
    /// # Errors
    /// Whatever `RowWriter::push` returns, the row stays unsealed.
    pub fn run(&self, mut row: RowWriter<'_>) -> Result<WorkerReport> {
        let started = Instant::now();
        let seed = self.seed.as_slice();
        let mut report = WorkerReport {
            worker: self.index,
            ..Default::default()
        };

        for n in self.assignment.candidates() {
            report.candidates += 1;
            if is_prime(n, seed) {
                row.push(n)?;
                report.primes += 1;
            }
        }

        row.seal();
        report.elapsed = started.elapsed();

        info!(
            worker = report.worker,
            candidates = report.candidates,
            primes = report.primes,
            elapsed_ms = report.elapsed.as_millis() as u64;
            "worker finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use partitioner::{Segment, Stride};

    use super::*;
    use crate::{SharedBuffer, SieveError};

    fn reference(n: u64) -> bool {
        n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
    }

    fn seed_up_to(limit: u64) -> KnownPrimes {
        KnownPrimes::new(vec![]).unwrap().extend_to(limit).0
    }

    #[test]
    fn agrees_with_reference_trial_division() {
        let seed = seed_up_to(100);
        for n in 3..10_000u64 {
            assert_eq!(is_prime(n, seed.as_slice()), reference(n), "n = {n}");
        }
    }

    #[test]
    fn rejects_squares_of_primes() {
        let seed = seed_up_to(100);
        for p in [3u64, 5, 7, 11, 13, 97] {
            assert!(!is_prime(p * p, seed.as_slice()), "{}", p * p);
        }
    }

    #[test]
    fn accepts_twin_primes() {
        let seed = seed_up_to(100);
        for (a, b) in [(3u64, 5), (11, 13), (29, 31), (1_019, 1_021), (9_929, 9_931)] {
            assert!(is_prime(a, seed.as_slice()) && is_prime(b, seed.as_slice()));
        }
    }

    #[test]
    fn small_and_even_numbers() {
        assert!(is_prime(2, &[]));
        assert!(is_prime(3, &[]));
        assert!(!is_prime(0, &[]));
        assert!(!is_prime(1, &[]));
        assert!(!is_prime(4, &[3]));
    }

    #[test]
    fn fills_row_in_ascending_order() {
        let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
        let mut buffer = SharedBuffer::new("w", 1, 16).unwrap();
        let row = buffer.writers().next().unwrap();

        let worker = SieveWorker::new(0, Assignment::Range(Segment::new(3, 29)), &seed);
        let report = worker.run(row).unwrap();

        assert_eq!(report.candidates, 14);
        assert_eq!(report.primes, 9);
        assert_eq!(buffer.row(0), Some(&[3, 5, 7, 11, 13, 17, 19, 23, 29][..]));
        assert!(buffer.is_sealed(0));
    }

    #[test]
    fn range_without_primes_leaves_row_zeroed() {
        let seed = KnownPrimes::new(vec![3, 5]).unwrap();
        let mut buffer = SharedBuffer::new("w", 1, 4).unwrap();
        let row = buffer.writers().next().unwrap();

        let worker = SieveWorker::new(0, Assignment::Range(Segment::new(24, 28)), &seed);
        let report = worker.run(row).unwrap();

        assert_eq!(report.primes, 0);
        assert_eq!(buffer.row(0), Some(&[][..]));
        assert!(buffer.is_sealed(0));
    }

    #[test]
    fn stride_assignment() {
        let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
        let mut buffer = SharedBuffer::new("w", 1, 16).unwrap();
        let row = buffer.writers().next().unwrap();

        let stride = Stride { start: 5, step: 4, last: 49 };
        SieveWorker::new(0, Assignment::Stride(stride), &seed)
            .run(row)
            .unwrap();

        // 5, 9, 13, ..., 49
        assert_eq!(buffer.row(0), Some(&[5, 13, 17, 29, 37, 41][..]));
    }

    #[test]
    fn overflow_leaves_row_unsealed() {
        let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
        let mut buffer = SharedBuffer::new("w", 1, 4).unwrap();
        let row = buffer.writers().next().unwrap();

        let worker = SieveWorker::new(0, Assignment::Range(Segment::new(3, 29)), &seed);
        assert_eq!(
            worker.run(row),
            Err(SieveError::RowOverflow { row: 0, capacity: 4 })
        );
        assert!(!buffer.is_sealed(0));
        assert_eq!(buffer.row(0), Some(&[3, 5, 7, 11][..]));
    }
}

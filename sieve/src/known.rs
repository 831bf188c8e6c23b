use std::sync::Arc;

use crate::{
    error::{Result, SieveError},
    worker::is_prime,
};

/// The ascending list of odd primes known before a run.
///
/// Cloning is cheap, every worker reads the same allocation and nobody
/// mutates it once the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPrimes(Arc<[u64]>);

impl KnownPrimes {
    /// Wraps a list of primes.
    ///
    /// # Arguments
    /// * `primes` - Strictly ascending primes, all `>= 3`.
    ///
    /// # Errors
    /// `UnsortedSeed` with the first offending index.
    pub fn new(primes: Vec<u64>) -> Result<Self> {
        if let Some(index) = primes.iter().position(|&p| p < 3) {
            return Err(SieveError::UnsortedSeed { index });
        }

        if let Some(index) = primes.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SieveError::UnsortedSeed { index: index + 1 });
        }

        Ok(Self(Arc::from(primes)))
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn largest(&self) -> Option<u64> {
        self.0.last().copied()
    }

    /// The last prime known before the next run, `2` for an empty seed.
    pub fn previous_prime(&self) -> u64 {
        self.largest().unwrap_or(2)
    }

    /// The first number a run continuing from this seed should test.
    pub fn next_candidate(&self) -> u64 {
        self.largest().map_or(3, |p| p + 2)
    }

    /// Whether the seed holds every divisor needed to test numbers up to `last`.
    pub fn covers(&self, last: u64) -> bool {
        let root = last.isqrt();
        root < 3 || self.largest().is_some_and(|p| p >= root)
    }

    /// Extends the seed by trial division until its largest prime is `>= limit`.
    ///
    /// # Returns
    /// The extended seed and the primes that were added.
    pub fn extend_to(&self, limit: u64) -> (Self, Vec<u64>) {
        let mut primes = self.0.to_vec();
        let mut added = Vec::new();
        let mut n = self.next_candidate();

        while primes.last().is_none_or(|&p| p < limit) {
            if is_prime(n, &primes) {
                primes.push(n);
                added.push(n);
            }
            n += 2;
        }

        (Self(Arc::from(primes)), added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsorted_or_small_values() {
        assert_eq!(
            KnownPrimes::new(vec![3, 7, 5]),
            Err(SieveError::UnsortedSeed { index: 2 })
        );
        assert_eq!(
            KnownPrimes::new(vec![2, 3]),
            Err(SieveError::UnsortedSeed { index: 0 })
        );
        assert_eq!(
            KnownPrimes::new(vec![3, 3]),
            Err(SieveError::UnsortedSeed { index: 1 })
        );
    }

    #[test]
    fn next_candidate_follows_the_largest_prime() {
        let empty = KnownPrimes::new(vec![]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.previous_prime(), 2);
        assert_eq!(empty.next_candidate(), 3);

        let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
        assert!(!seed.is_empty());
        assert_eq!(seed.previous_prime(), 7);
        assert_eq!(seed.next_candidate(), 9);
    }

    #[test]
    fn covers_checks_square_root() {
        let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
        assert!(seed.covers(29));
        assert!(seed.covers(49));
        assert!(seed.covers(63));
        assert!(!seed.covers(64));
        assert!(KnownPrimes::new(vec![]).unwrap().covers(8));
        assert!(!KnownPrimes::new(vec![]).unwrap().covers(9));
    }

    #[test]
    fn extend_to_generates_missing_primes() {
        let empty = KnownPrimes::new(vec![]).unwrap();
        let (seed, added) = empty.extend_to(30);
        assert_eq!(seed.as_slice(), [3, 5, 7, 11, 13, 17, 19, 23, 29, 31]);
        assert_eq!(added, seed.as_slice());

        let (longer, added) = seed.extend_to(45);
        assert_eq!(added, [37, 41, 43, 47]);
        assert_eq!(longer.largest(), Some(47));
        assert!(longer.covers(47 * 47));
    }

    #[test]
    fn extend_to_is_a_noop_when_already_covered() {
        let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
        let (same, added) = seed.extend_to(5);
        assert!(added.is_empty());
        assert_eq!(same, seed);
    }
}

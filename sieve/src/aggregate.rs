use std::{cmp::Reverse, collections::BinaryHeap, num::NonZeroUsize};

use partitioner::PartitionMode;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    buffer::SharedBuffer,
    error::{Result, SieveError},
};

/// Records handed to persistence per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// A prime found by a run, with the metadata derived while aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPrime {
    pub number: u64,
    pub is_mersenne: bool,
    pub gap_from_previous: u64,
}

impl DiscoveredPrime {
    /// Creates a record for `number`, `previous` being the prime right before it.
    pub fn new(number: u64, previous: u64) -> Self {
        Self {
            number,
            is_mersenne: (number + 1).is_power_of_two(),
            gap_from_previous: number.saturating_sub(previous),
        }
    }
}

/// The order in which buffer rows are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Row after row, correct when rows hold ascending disjoint ranges.
    Sequential,
    /// K-way merge by value, needed when rows interleave.
    Merged,
}

impl From<PartitionMode> for RowOrder {
    fn from(mode: PartitionMode) -> Self {
        match mode {
            PartitionMode::Balanced => Self::Sequential,
            PartitionMode::Striped => Self::Merged,
        }
    }
}

/// Reads a fully written `SharedBuffer` back as `DiscoveredPrime` records.
///
/// Every iterator it returns starts from the beginning of the buffer, so the
/// output can be consumed as many times as needed and is always the same.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    buffer: &'a SharedBuffer,
    order: RowOrder,
    previous: u64,
    batch_size: NonZeroUsize,
}

impl<'a> Aggregator<'a> {
    /// Creates a new `Aggregator`.
    ///
    /// # Arguments
    /// * `buffer` - The buffer, after every worker finished.
    /// * `order` - How rows relate to each other.
    /// * `previous` - The last prime known before the run, the first gap is measured from it.
    ///
    /// # Errors
    /// `UnsealedRow` if any worker didn't complete its row.
    pub fn new(buffer: &'a SharedBuffer, order: RowOrder, previous: u64) -> Result<Self> {
        if let Some(row) = buffer.unsealed().next() {
            return Err(SieveError::UnsealedRow { row });
        }

        Ok(Self {
            buffer,
            order,
            previous,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
        })
    }

    pub fn batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Raw numbers in aggregation order.
    pub fn numbers(&self) -> Box<dyn Iterator<Item = u64> + 'a> {
        match self.order {
            RowOrder::Sequential => Box::new(
                self.buffer
                    .live_rows()
                    .flat_map(|row| row.iter().map(|&v| v as u64)),
            ),
            RowOrder::Merged => Box::new(MergedRows::new(self.buffer.live_rows().collect())),
        }
    }

    /// Every discovered prime, with gaps measured along aggregation order.
    pub fn primes(&self) -> Primes<'a> {
        Primes {
            numbers: self.numbers(),
            previous: self.previous,
        }
    }

    /// The primes grouped in batches of at most `batch_size` records.
    pub fn batches(&self) -> Batches<'a> {
        Batches {
            primes: self.primes(),
            size: self.batch_size.get(),
        }
    }

    /// Amount of primes held in the buffer.
    pub fn len(&self) -> usize {
        self.buffer.live_rows().map(<[i32]>::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draws `count` primes uniformly at random, with replacement.
    ///
    /// # Returns
    /// An empty vector when the buffer holds no primes.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<u64> {
        let total = self.len();
        if total == 0 {
            return Vec::new();
        }

        (0..count)
            .filter_map(|_| {
                let mut k = rng.random_range(0..total);
                for row in self.buffer.live_rows() {
                    if k < row.len() {
                        return Some(row[k] as u64);
                    }
                    k -= row.len();
                }
                None
            })
            .collect()
    }
}

/// Ascending merge of rows that are each sorted.
struct MergedRows<'a> {
    rows: Vec<&'a [i32]>,
    cursors: Vec<usize>,
    heap: BinaryHeap<Reverse<(i32, usize)>>,
}

impl<'a> MergedRows<'a> {
    fn new(rows: Vec<&'a [i32]>) -> Self {
        let heap = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.first().map(|&v| Reverse((v, i))))
            .collect();

        Self {
            cursors: vec![0; rows.len()],
            rows,
            heap,
        }
    }
}

impl Iterator for MergedRows<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let Reverse((value, row)) = self.heap.pop()?;

        self.cursors[row] += 1;
        if let Some(&next) = self.rows[row].get(self.cursors[row]) {
            self.heap.push(Reverse((next, row)));
        }

        Some(value as u64)
    }
}

/// Iterator over `DiscoveredPrime`s, see `Aggregator::primes`.
pub struct Primes<'a> {
    numbers: Box<dyn Iterator<Item = u64> + 'a>,
    previous: u64,
}

impl Iterator for Primes<'_> {
    type Item = DiscoveredPrime;

    fn next(&mut self) -> Option<DiscoveredPrime> {
        let number = self.numbers.next()?;
        let prime = DiscoveredPrime::new(number, self.previous);
        self.previous = number;
        Some(prime)
    }
}

/// Iterator over fixed size batches, see `Aggregator::batches`.
pub struct Batches<'a> {
    primes: Primes<'a>,
    size: usize,
}

impl Iterator for Batches<'_> {
    type Item = Vec<DiscoveredPrime>;

    fn next(&mut self) -> Option<Vec<DiscoveredPrime>> {
        let batch: Vec<_> = self.primes.by_ref().take(self.size).collect();
        (!batch.is_empty()).then_some(batch)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn filled(rows: &[&[u64]], capacity: usize) -> SharedBuffer {
        let mut buffer = SharedBuffer::new("agg", rows.len(), capacity).unwrap();
        for (mut writer, values) in buffer.writers().zip(rows) {
            for &v in *values {
                writer.push(v).unwrap();
            }
            writer.seal();
        }
        buffer
    }

    #[test]
    fn mersenne_flags() {
        for p in [3, 7, 31, 127, 8_191, 131_071] {
            assert!(DiscoveredPrime::new(p, 2).is_mersenne, "{p}");
        }
        for p in [5, 11, 13, 8_191 + 2] {
            assert!(!DiscoveredPrime::new(p, 2).is_mersenne, "{p}");
        }
    }

    #[test]
    fn sequential_gaps_run_across_rows() {
        let buffer = filled(&[&[3, 5, 7, 11, 13], &[17, 19, 23, 29]], 8);
        let aggregator = Aggregator::new(&buffer, RowOrder::Sequential, 2).unwrap();

        let primes: Vec<_> = aggregator.primes().collect();
        let numbers: Vec<_> = primes.iter().map(|p| p.number).collect();
        let gaps: Vec<_> = primes.iter().map(|p| p.gap_from_previous).collect();

        assert_eq!(numbers, [3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert_eq!(gaps, [1, 2, 2, 4, 2, 4, 2, 4, 6]);
    }

    #[test]
    fn merged_order_sorts_interleaved_rows() {
        // Two strides over the odd numbers of [3, 41].
        let buffer = filled(&[&[3, 7, 11, 19, 23, 31], &[5, 13, 17, 29, 37, 41]], 8);
        let aggregator = Aggregator::new(&buffer, RowOrder::Merged, 2).unwrap();

        let numbers: Vec<_> = aggregator.numbers().collect();
        assert_eq!(numbers, [3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41]);

        let gaps: Vec<_> = aggregator.primes().map(|p| p.gap_from_previous).collect();
        assert_eq!(gaps, [1, 2, 2, 4, 2, 4, 2, 4, 6, 2, 6, 4]);
    }

    #[test]
    fn empty_rows_produce_nothing() {
        let buffer = filled(&[&[], &[101, 103], &[]], 4);
        let aggregator = Aggregator::new(&buffer, RowOrder::Sequential, 97).unwrap();

        let primes: Vec<_> = aggregator.primes().collect();
        assert_eq!(
            primes,
            [DiscoveredPrime::new(101, 97), DiscoveredPrime::new(103, 101)]
        );

        let empty = filled(&[&[]], 4);
        let aggregator = Aggregator::new(&empty, RowOrder::Merged, 2).unwrap();
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.batches().count(), 0);
    }

    #[test]
    fn full_rows_are_read_to_capacity() {
        let buffer = filled(&[&[3, 5], &[7, 11]], 2);
        let aggregator = Aggregator::new(&buffer, RowOrder::Sequential, 2).unwrap();
        assert_eq!(aggregator.numbers().collect::<Vec<_>>(), [3, 5, 7, 11]);
    }

    #[test]
    fn reading_twice_gives_the_same_records() {
        let buffer = filled(&[&[3, 7, 11], &[5, 13]], 4);
        let aggregator = Aggregator::new(&buffer, RowOrder::Merged, 2).unwrap();

        let first: Vec<_> = aggregator.batches().flatten().collect();
        let second: Vec<_> = aggregator.batches().flatten().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn batches_are_bounded() {
        let values: Vec<u64> = (0..25).map(|i| 2 * i + 3).collect();
        let buffer = filled(&[&values], 32);
        let aggregator = Aggregator::new(&buffer, RowOrder::Sequential, 2)
            .unwrap()
            .batch_size(NonZeroUsize::new(10).unwrap());

        let sizes: Vec<_> = aggregator.batches().map(|b| b.len()).collect();
        assert_eq!(sizes, [10, 10, 5]);
    }

    #[test]
    fn refuses_unsealed_rows() {
        let mut buffer = SharedBuffer::new("agg", 2, 4).unwrap();
        {
            let mut writers = buffer.writers();
            writers.next().unwrap().seal();
        }

        assert_eq!(
            Aggregator::new(&buffer, RowOrder::Sequential, 2).unwrap_err(),
            SieveError::UnsealedRow { row: 1 }
        );
    }

    #[test]
    fn samples_come_from_the_buffer() {
        let buffer = filled(&[&[3, 5, 7], &[11, 13]], 4);
        let aggregator = Aggregator::new(&buffer, RowOrder::Sequential, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let sample = aggregator.sample(&mut rng, 50);
        assert_eq!(sample.len(), 50);
        assert!(sample.iter().all(|n| [3, 5, 7, 11, 13].contains(n)));

        let empty = filled(&[&[]], 4);
        let aggregator = Aggregator::new(&empty, RowOrder::Sequential, 2).unwrap();
        assert!(aggregator.sample(&mut rng, 5).is_empty());
    }

    #[test]
    fn records_serialize_as_flat_json() {
        let json = serde_json::to_string(&DiscoveredPrime::new(31, 29)).unwrap();
        assert_eq!(json, r#"{"number":31,"is_mersenne":true,"gap_from_previous":2}"#);
    }
}

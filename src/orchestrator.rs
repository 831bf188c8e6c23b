use std::time::{Duration, Instant};

use log::{debug, info};
use partitioner::{PartitionMode, PartitionPlan, RangePartitioner};
use sieve::{Aggregator, DiscoveredPrime, KnownPrimes, SharedBuffer, SievePool, WorkerReport};
use tokio::task;

use crate::{
    config::RunConfig,
    error::{OrchestratorError, Result},
    store::PrimeStore,
};

/// The numbers one run tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRange {
    /// First candidate, inclusive.
    pub first: u64,
    /// Last candidate, inclusive.
    pub last: u64,
    /// The prime right before `first`, used for the first gap.
    pub previous: u64,
}

impl SearchRange {
    /// Continues right after the largest prime in `seed`.
    pub fn after(seed: &KnownPrimes, last: u64) -> Self {
        Self {
            first: seed.next_candidate(),
            last,
            previous: seed.previous_prime(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: PartitionMode,
    pub first: u64,
    pub last: u64,
    pub row_capacity: usize,
    pub reports: Vec<WorkerReport>,
    /// Primes read back from the buffer.
    pub discovered: usize,
    /// Primes the store didn't know yet.
    pub persisted: usize,
    pub samples: Vec<u64>,
    pub elapsed: Duration,
}

/// Drives one run: partition, sieve in parallel, aggregate and persist.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: RunConfig,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Loads the known primes and extends them up to `sqrt(last_number)`.
    ///
    /// Primes added by the extension are persisted before returning, so the
    /// store stays gap free.
    ///
    /// # Errors
    /// `Persistence` if the store can't be read or written, `Sieve` if the
    /// stored primes aren't strictly ascending.
    pub async fn prepare_seed<S: PrimeStore>(&self, store: &mut S) -> Result<KnownPrimes> {
        let seed = KnownPrimes::new(store.known_primes().await?)?;
        let last = self.config.last_number();

        if seed.covers(last) {
            debug!(known = seed.len(); "seed already covers {last}");
            return Ok(seed);
        }

        let mut previous = seed.previous_prime();
        let (seed, added) = seed.extend_to(last.isqrt());

        let records: Vec<_> = added
            .iter()
            .map(|&p| {
                let record = DiscoveredPrime::new(p, previous);
                previous = p;
                record
            })
            .collect();

        for batch in records.chunks(self.config.batch_size().get()) {
            store.insert_batch(batch).await?;
        }

        info!(added = added.len(), known = seed.len(); "extended seed to cover {last}");
        Ok(seed)
    }

    /// Runs from right after the seed's largest prime up to `last_number`.
    ///
    /// # Errors
    /// See `Orchestrator::run_range`.
    pub async fn run<S: PrimeStore>(&self, seed: KnownPrimes, store: &mut S) -> Result<RunSummary> {
        let range = SearchRange::after(&seed, self.config.last_number());
        self.run_range(seed, range, store).await
    }

    /// Finds every prime in `range` and hands them to `store` in batches.
    ///
    /// Nothing is persisted unless every worker finished its assignment, and
    /// the shared buffer is released on every path out of this function.
    ///
    /// # Arguments
    /// * `seed` - Known primes, at least up to `sqrt(range.last)`.
    /// * `range` - The candidates to test.
    /// * `store` - Sink for the discovered primes.
    ///
    /// # Returns
    /// A summary of the run.
    ///
    /// # Errors
    /// `SeedTooShort` before computing anything, `Partition` for a range that
    /// can't be planned, `WorkerFailure` if a worker didn't finish and
    /// `Persistence` if the store rejects a batch.
    pub async fn run_range<S: PrimeStore>(
        &self,
        seed: KnownPrimes,
        range: SearchRange,
        store: &mut S,
    ) -> Result<RunSummary> {
        if !seed.covers(range.last) {
            return Err(OrchestratorError::SeedTooShort {
                largest: seed.largest(),
                last: range.last,
            });
        }

        let started = Instant::now();

        let plan = RangePartitioner::new(self.config.workers(), range.first, range.last)?
            .margin(self.config.margin())?
            .plan(self.config.mode())?;

        let buffer = SharedBuffer::new(
            self.config.buffer_name(),
            plan.workers(),
            plan.row_capacity(),
        )?;

        let (buffer, plan, reports) = sieve(plan, seed, buffer).await?;

        let aggregator = Aggregator::new(&buffer, plan.mode().into(), range.previous)?
            .batch_size(self.config.batch_size());

        let samples = aggregator.sample(&mut rand::rng(), self.config.sample());

        let mut discovered = 0;
        let mut persisted = 0;

        for batch in aggregator.batches() {
            let inserted = store.insert_batch(&batch).await?;
            debug!(records = batch.len(), inserted = inserted; "persisted batch");

            discovered += batch.len();
            persisted += inserted;
        }

        let summary = RunSummary {
            mode: plan.mode(),
            first: plan.first(),
            last: plan.last(),
            row_capacity: plan.row_capacity(),
            reports,
            discovered,
            persisted,
            samples,
            elapsed: started.elapsed(),
        };

        info!(
            discovered = summary.discovered,
            persisted = summary.persisted,
            elapsed_ms = summary.elapsed.as_millis() as u64;
            "run over [{}, {}] finished",
            summary.first,
            summary.last
        );

        Ok(summary)
    }
}

/// Runs the sieve pool off the async runtime and hands everything back.
async fn sieve(
    plan: PartitionPlan,
    seed: KnownPrimes,
    mut buffer: SharedBuffer,
) -> Result<(SharedBuffer, PartitionPlan, Vec<WorkerReport>)> {
    task::spawn_blocking(move || -> Result<_> {
        let pool = SievePool::new(plan.workers())?;
        let reports = pool.run(&plan, &seed, &mut buffer)?;
        Ok((buffer, plan, reports))
    })
    .await?
}

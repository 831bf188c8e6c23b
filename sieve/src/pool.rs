use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use log::error;
use partitioner::PartitionPlan;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    buffer::SharedBuffer,
    error::{Result, SieveError},
    known::KnownPrimes,
    worker::{SieveWorker, WorkerReport},
};

/// A dedicated pool with one thread per sieve worker.
pub struct SievePool {
    pool: ThreadPool,
}

impl SievePool {
    /// Creates a pool with exactly `workers` threads.
    ///
    /// # Errors
    /// `Pool` if the threads cannot be spawned.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sieve-{i}"))
            .build()
            .map_err(|e| SieveError::Pool(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Spawns one task per plan assignment and blocks until every task ended.
    ///
    /// Task `i` owns row `i` of `buffer` and nothing else. A task that
    /// panics or overflows its row leaves that row unsealed.
    ///
    /// # Arguments
    /// * `plan` - One assignment per buffer row.
    /// * `seed` - Read only divisors shared by every task.
    /// * `buffer` - The zeroed output grid.
    ///
    /// # Returns
    /// The per worker reports in row order.
    ///
    /// # Errors
    /// `PlanMismatch` before spawning anything, otherwise the failure of the
    /// lowest numbered worker that didn't finish.
    pub fn run(
        &self,
        plan: &PartitionPlan,
        seed: &KnownPrimes,
        buffer: &mut SharedBuffer,
    ) -> Result<Vec<WorkerReport>> {
        if buffer.rows() != plan.workers() {
            return Err(SieveError::PlanMismatch {
                rows: buffer.rows(),
                assignments: plan.workers(),
            });
        }

        let mut outcomes: Vec<Option<Result<WorkerReport>>> = vec![None; plan.workers()];

        self.pool.scope(|scope| {
            let tasks = buffer
                .writers()
                .zip(plan.assignments())
                .zip(outcomes.iter_mut());

            for ((row, &assignment), slot) in tasks {
                scope.spawn(move |_| {
                    let index = row.index();
                    let worker = SieveWorker::new(index, assignment, seed);
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker.run(row)));

                    *slot = Some(outcome.unwrap_or_else(|payload| {
                        Err(SieveError::WorkerPanicked {
                            worker: index,
                            msg: panic_message(payload.as_ref()),
                        })
                    }));
                });
            }
        });

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut failure = None;

        for (worker, outcome) in outcomes.into_iter().enumerate() {
            let outcome = outcome.unwrap_or_else(|| {
                Err(SieveError::WorkerPanicked {
                    worker,
                    msg: "task never reported".into(),
                })
            });

            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(worker = worker; "sieve worker failed: {e}");
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".into()
    }
}

mod aggregate;
mod buffer;
mod error;
mod known;
mod pool;
mod worker;

pub use aggregate::{Aggregator, Batches, DEFAULT_BATCH_SIZE, DiscoveredPrime, Primes, RowOrder};
pub use buffer::{RowWriter, SharedBuffer};
pub use error::{Result, SieveError};
pub use known::KnownPrimes;
pub use pool::SievePool;
pub use worker::{SieveWorker, WorkerReport, is_prime};

//! Parallel prime enumeration over a persisted store of known primes.
//!
//! The search range is split between workers by estimated cost, every
//! worker trial divides its share into its own row of a shared buffer and
//! the rows are read back in ascending order as `DiscoveredPrime` records.

pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod store;

pub use config::{RunConfig, RunConfigBuilder};
pub use error::{ConfigError, OrchestratorError, Result};
pub use orchestrator::{Orchestrator, RunSummary, SearchRange};
pub use store::{JsonLinesStore, MemoryStore, PrimeStore};

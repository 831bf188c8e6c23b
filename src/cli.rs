use std::{path::PathBuf, str::FromStr};

use partitioner::PartitionMode;

use crate::{config::RunConfig, error::ConfigError};

/// Random primes reported by `--show-random-prime-numbers`.
pub const LEGACY_SAMPLE: usize = 200;

pub const USAGE: &str = "\
usage: primes [options]

options:
  --striped                 give every worker every n-th odd number instead of a balanced range
                            (alias: --equal-iteration-option)
  --last-number N           inclusive upper bound, between 50000 and 1000000000
  --workers N               workers to run, clamped to [2, available cores]
  --margin F                row capacity safety factor, at least 1.0
  --batch-size N            records persisted per batch
  --store PATH              JSON lines file holding the known primes
  --sample N                report N random primes found by the run
  --show-random-prime-numbers
                            same as --sample 200
  -h, --help                print this message";

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(RunConfig),
    Help,
}

/// Parses the arguments that follow the program name.
///
/// # Errors
/// A `ConfigError` for unknown flags, missing or malformed values and any
/// setting `RunConfig` rejects.
pub fn parse<I, S>(args: I) -> Result<Command, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut builder = RunConfig::builder();

    while let Some(flag) = args.next() {
        builder = match flag.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--striped" | "--equal-iteration-option" => builder.mode(PartitionMode::Striped),
            "--show-random-prime-numbers" => builder.sample(LEGACY_SAMPLE),
            "--last-number" => builder.last_number(value(&flag, args.next())?),
            "--workers" => builder.workers(value(&flag, args.next())?),
            "--margin" => builder.margin(value(&flag, args.next())?),
            "--batch-size" => builder.batch_size(value(&flag, args.next())?),
            "--sample" => builder.sample(value(&flag, args.next())?),
            "--store" => builder.store(value::<PathBuf>(&flag, args.next())?),
            _ => return Err(ConfigError::UnknownFlag(flag)),
        };
    }

    builder.build().map(Command::Run)
}

fn value<T: FromStr>(flag: &str, raw: Option<String>) -> Result<T, ConfigError> {
    let raw = raw.ok_or_else(|| ConfigError::MissingValue(flag.to_string()))?;
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        flag: flag.to_string(),
        value: raw,
    })
}

use std::{env, process};

use anyhow::Context;
use env_logger::Env;
use log::info;
use prime_orchestration::{
    JsonLinesStore, Orchestrator, SearchRange,
    cli::{self, Command, USAGE},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match cli::parse(env::args().skip(1)) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            process::exit(2);
        }
    };

    let mut store = JsonLinesStore::open(config.store())
        .await
        .with_context(|| format!("opening {}", config.store().display()))?;
    info!(known = store.len(); "prime store at {}", store.path().display());

    let orchestrator = Orchestrator::new(config);
    let seed = orchestrator.prepare_seed(&mut store).await?;

    let last = orchestrator.config().last_number();
    if SearchRange::after(&seed, last).is_empty() {
        info!("every prime up to {last} is already known");
        return Ok(());
    }

    let summary = orchestrator.run(seed, &mut store).await?;

    for report in &summary.reports {
        info!(
            worker = report.worker,
            candidates = report.candidates,
            primes = report.primes;
            "worker took {:.3}s",
            report.elapsed.as_secs_f64()
        );
    }

    println!(
        "{} primes found in [{}, {}], {} new, {:?} mode, {:.3}s",
        summary.discovered,
        summary.first,
        summary.last,
        summary.persisted,
        summary.mode,
        summary.elapsed.as_secs_f64()
    );

    if !summary.samples.is_empty() {
        println!(
            "{} random primes from this run: {:?}",
            summary.samples.len(),
            summary.samples
        );
    }

    Ok(())
}

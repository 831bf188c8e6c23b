use std::{env, process};

use partitioner::PartitionMode;
use prime_orchestration::{
    JsonLinesStore, MemoryStore, Orchestrator, OrchestratorError, PrimeStore, RunConfig,
    SearchRange,
};
use sieve::KnownPrimes;

fn config(mode: PartitionMode) -> RunConfig {
    RunConfig::builder()
        .mode(mode)
        .last_number(60_000)
        .workers(2)
        .batch_size(1_000)
        .build()
        .unwrap()
}

fn reference_primes(first: u64, last: u64) -> Vec<u64> {
    (first.max(3)..=last)
        .filter(|&n| n % 2 == 1)
        .filter(|&n| (3..).step_by(2).take_while(|d| d * d <= n).all(|d| n % d != 0))
        .collect()
}

#[tokio::test]
async fn small_range_scenario() {
    let orchestrator = Orchestrator::new(config(PartitionMode::Balanced));
    let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
    let range = SearchRange {
        first: 3,
        last: 29,
        previous: 2,
    };
    let mut store = MemoryStore::new();

    let summary = orchestrator.run_range(seed, range, &mut store).await.unwrap();
    assert_eq!(summary.discovered, 9);
    assert_eq!(summary.persisted, 9);
    assert_eq!(summary.reports.len(), 2);

    let records = store.records();
    let numbers: Vec<_> = records.iter().map(|r| r.number).collect();
    let gaps: Vec<_> = records.iter().map(|r| r.gap_from_previous).collect();
    let mersenne: Vec<_> = records.iter().filter(|r| r.is_mersenne).map(|r| r.number).collect();

    assert_eq!(numbers, vec![3, 5, 7, 11, 13, 17, 19, 23, 29]);
    assert_eq!(gaps, vec![1, 2, 2, 4, 2, 4, 2, 4, 6]);
    assert_eq!(mersenne, vec![3, 7]);
}

#[tokio::test]
async fn rerunning_a_range_persists_nothing_new() {
    let orchestrator = Orchestrator::new(config(PartitionMode::Balanced));
    let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
    let range = SearchRange {
        first: 3,
        last: 29,
        previous: 2,
    };
    let mut store = MemoryStore::new();

    orchestrator
        .run_range(seed.clone(), range, &mut store)
        .await
        .unwrap();
    let again = orchestrator.run_range(seed, range, &mut store).await.unwrap();

    assert_eq!(again.discovered, 9);
    assert_eq!(again.persisted, 0);
    assert_eq!(store.len(), 9);
}

#[tokio::test]
async fn both_modes_store_the_same_records() {
    let mut stores = Vec::new();

    for mode in [PartitionMode::Balanced, PartitionMode::Striped] {
        let orchestrator = Orchestrator::new(config(mode));
        let mut store = MemoryStore::new();

        let seed = orchestrator.prepare_seed(&mut store).await.unwrap();
        let summary = orchestrator.run(seed, &mut store).await.unwrap();
        assert_eq!(summary.mode, mode);
        assert_eq!(summary.last, 60_000);

        stores.push(store.records());
    }

    assert_eq!(stores[0], stores[1]);

    let numbers: Vec<_> = stores[0].iter().map(|r| r.number).collect();
    assert_eq!(numbers, reference_primes(3, 60_000));

    let mut previous = 2;
    for record in &stores[0] {
        assert_eq!(record.gap_from_previous, record.number - previous);
        previous = record.number;
    }
}

#[tokio::test]
async fn seed_is_extended_and_persisted_first() {
    let orchestrator = Orchestrator::new(config(PartitionMode::Balanced));
    let mut store = MemoryStore::with_primes([3, 5, 7]);

    let seed = orchestrator.prepare_seed(&mut store).await.unwrap();
    assert!(seed.covers(60_000));
    assert_eq!(seed.largest(), Some(251));

    let known = store.known_primes().await.unwrap();
    assert_eq!(known, reference_primes(3, 251));

    let records = store.records();
    assert_eq!(records[3].number, 11);
    assert_eq!(records[3].gap_from_previous, 4);
}

#[tokio::test]
async fn continues_after_the_largest_known_prime() {
    let orchestrator = Orchestrator::new(config(PartitionMode::Striped));
    let mut store = MemoryStore::with_primes(reference_primes(3, 30_011));

    let seed = orchestrator.prepare_seed(&mut store).await.unwrap();
    let summary = orchestrator.run(seed, &mut store).await.unwrap();

    assert_eq!(summary.first, 30_013);
    assert_eq!(summary.persisted, summary.discovered);

    let records = store.records();
    let first_new = records.iter().find(|r| r.number > 30_011).unwrap();
    assert_eq!(first_new.number, 30_013);
    assert_eq!(first_new.gap_from_previous, 2);
    assert_eq!(
        records.iter().map(|r| r.number).collect::<Vec<_>>(),
        reference_primes(3, 60_000)
    );
}

#[tokio::test]
async fn short_seed_is_rejected_before_computing() {
    let orchestrator = Orchestrator::new(config(PartitionMode::Balanced));
    let seed = KnownPrimes::new(vec![3, 5, 7]).unwrap();
    let mut store = MemoryStore::new();

    let err = orchestrator.run(seed, &mut store).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::SeedTooShort {
            largest: Some(7),
            last: 60_000
        }
    ));
    assert!(store.is_empty());
}

#[tokio::test]
async fn samples_come_from_the_run() {
    let config = RunConfig::builder()
        .last_number(60_000)
        .workers(2)
        .sample(25)
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(config);
    let mut store = MemoryStore::new();

    let seed = orchestrator.prepare_seed(&mut store).await.unwrap();
    let range = SearchRange::after(&seed, 60_000);
    let summary = orchestrator.run(seed, &mut store).await.unwrap();

    assert_eq!(summary.samples.len(), 25);
    let primes = reference_primes(range.first, 60_000);
    assert!(summary.samples.iter().all(|s| primes.binary_search(s).is_ok()));
}

#[tokio::test]
async fn file_store_end_to_end() {
    let path = env::temp_dir().join(format!("primes-{}-e2e.jsonl", process::id()));
    let _ = tokio::fs::remove_file(&path).await;

    let config = RunConfig::builder()
        .last_number(50_000)
        .workers(2)
        .store(&path)
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(config);

    {
        let mut store = JsonLinesStore::open(&path).await.unwrap();
        let seed = orchestrator.prepare_seed(&mut store).await.unwrap();
        orchestrator.run(seed, &mut store).await.unwrap();
    }

    let mut store = JsonLinesStore::open(&path).await.unwrap();
    let seed = orchestrator.prepare_seed(&mut store).await.unwrap();
    assert_eq!(seed.as_slice(), reference_primes(3, 50_000).as_slice());
    assert!(SearchRange::after(&seed, 50_000).is_empty());

    tokio::fs::remove_file(&path).await.unwrap();
}

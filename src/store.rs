use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::debug;
use parking_lot::Mutex;
use sieve::DiscoveredPrime;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
};

/// Durable home of discovered primes, also the source of the next run's seed.
///
/// Inserts are idempotent, a number that is already stored is skipped
/// silently since re-runs may rediscover primes near their boundaries.
#[trait_variant::make(PrimeStore: Send)]
pub trait LocalPrimeStore {
    /// Every stored prime greater than 2, ascending.
    async fn known_primes(&self) -> io::Result<Vec<u64>>;

    /// Stores the records whose numbers aren't stored yet.
    ///
    /// # Returns
    /// How many records were new.
    async fn insert_batch(&mut self, batch: &[DiscoveredPrime]) -> io::Result<usize>;
}

/// Append only file holding one JSON `DiscoveredPrime` per line.
#[derive(Debug)]
pub struct JsonLinesStore<W = File> {
    path: PathBuf,
    numbers: Vec<u64>,
    writer: BufWriter<W>,
}

impl JsonLinesStore {
    /// Opens the store at `path`, creating an empty file if there is none.
    ///
    /// # Errors
    /// Io errors, or `InvalidData` naming the first line that isn't a record.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut numbers = match fs::read_to_string(&path).await {
            Ok(content) => parse_records(&path, &content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        numbers.sort_unstable();
        numbers.dedup();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        debug!(records = numbers.len(); "opened {}", path.display());

        Ok(Self::with_writer(path, numbers, file))
    }
}

impl<W: AsyncWrite + Unpin> JsonLinesStore<W> {
    /// `numbers` must be sorted and free of duplicates.
    fn with_writer(path: PathBuf, numbers: Vec<u64>, writer: W) -> Self {
        Self {
            path,
            numbers,
            writer: BufWriter::new(writer),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    fn contains(&self, number: u64) -> bool {
        self.numbers.binary_search(&number).is_ok()
    }

    /// Records a number that is now on disk.
    fn remember(&mut self, number: u64) {
        if self.numbers.last().is_none_or(|&last| last < number) {
            self.numbers.push(number);
        } else if let Err(i) = self.numbers.binary_search(&number) {
            self.numbers.insert(i, number);
        }
    }
}

fn parse_records(path: &Path, content: &str) -> io::Result<Vec<u64>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<DiscoveredPrime>(line)
                .map(|record| record.number)
                .map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("{}:{}: {e}", path.display(), i + 1),
                    )
                })
        })
        .collect()
}

impl<W: AsyncWrite + Unpin + Send + Sync> PrimeStore for JsonLinesStore<W> {
    async fn known_primes(&self) -> io::Result<Vec<u64>> {
        Ok(self.numbers.iter().copied().filter(|&n| n > 2).collect())
    }

    /// Numbers are only remembered once the batch was flushed, a failed
    /// write leaves the store as it was.
    async fn insert_batch(&mut self, batch: &[DiscoveredPrime]) -> io::Result<usize> {
        let mut fresh = BTreeSet::new();
        let mut out = Vec::new();

        for record in batch {
            if !self.contains(record.number) && fresh.insert(record.number) {
                serde_json::to_writer(&mut out, record)?;
                out.push(b'\n');
            }
        }

        if fresh.is_empty() {
            return Ok(0);
        }

        self.writer.write_all(&out).await?;
        self.writer.flush().await?;

        for &number in &fresh {
            self.remember(number);
        }

        Ok(fresh.len())
    }
}

/// In memory store, clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<u64, DiscoveredPrime>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already knows `primes`, gaps are computed between them.
    pub fn with_primes(primes: impl IntoIterator<Item = u64>) -> Self {
        let mut previous = 2;
        let records = primes
            .into_iter()
            .map(|p| {
                let record = DiscoveredPrime::new(p, previous);
                previous = p;
                (p, record)
            })
            .collect();

        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// A snapshot of every stored record, ascending.
    pub fn records(&self) -> Vec<DiscoveredPrime> {
        self.records.lock().values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl PrimeStore for MemoryStore {
    async fn known_primes(&self) -> io::Result<Vec<u64>> {
        Ok(self.records.lock().range(3..).map(|(&n, _)| n).collect())
    }

    async fn insert_batch(&mut self, batch: &[DiscoveredPrime]) -> io::Result<usize> {
        let mut records = self.records.lock();
        let mut inserted = 0;

        for record in batch {
            if !records.contains_key(&record.number) {
                records.insert(record.number, *record);
                inserted += 1;
            }
        }

        Ok(inserted)
    }
}

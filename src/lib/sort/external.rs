//! Bounded-memory external merge sort over records.
//!
//! # Algorithm
//!
//! 1. **Accumulate phase**: buffer `(key, arrival, record)` entries up to a record budget
//! 2. **Sort phase**: sort the buffer by `(key, arrival)`, in parallel with rayon when
//!    `threads > 1`
//! 3. **Spill phase**: write the sorted buffer as a numbered BAM run in a scratch directory
//! 4. **Merge phase**: k-way merge of the runs using a binary heap ordered by
//!    `(key, run index)`, holding one record per run
//!
//! Because every entry carries its arrival sequence number, and runs are cut from the input
//! in arrival order, records with equal keys come out in the order they went in.
//!
//! [`ExternalSorter::finish`] returns one of three shapes (see [`SortedKind`]). Inputs that
//! fit in the budget never touch scratch storage, and a single spilled run is streamed back
//! directly without a heap.
//!
//! The scratch directory is a [`TempDir`] created on the first spill. It moves into the
//! returned [`SortedRecords`] and is removed when that is dropped, whether the merge ran to
//! completion, failed, or was abandoned.

use crate::errors::{Result, RgError};
use crate::sort::keys::SortKey;
use log::{debug, info};
use noodles::bam;
use noodles::sam::Header;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record_buf::RecordBuf;
use rayon::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default number of records held in memory before spilling a run.
pub const DEFAULT_MAX_RECORDS_IN_RAM: usize = 500_000;

/// Buffer size for reading runs during merge.
const MERGE_BUFFER_SIZE: usize = 64 * 1024;

/// External sorter for records, generic over the sort key.
pub struct ExternalSorter<K: SortKey> {
    /// Header written to (and used to decode) every run.
    header: Header,
    /// Records buffered before a run is spilled.
    max_records_in_ram: usize,
    /// Parent directory for the scratch directory.
    temp_dir: Option<PathBuf>,
    /// Number of threads for parallel operations.
    threads: usize,
    buffer: Vec<(K, u64, RecordBuf)>,
    next_seq: u64,
    scratch: Option<TempDir>,
    runs: Vec<PathBuf>,
    stats: SortStats,
}

impl<K: SortKey> ExternalSorter<K> {
    /// Create a sorter whose runs are written with `header`.
    #[must_use]
    pub fn new(header: Header) -> Self {
        Self {
            header,
            max_records_in_ram: DEFAULT_MAX_RECORDS_IN_RAM,
            temp_dir: None,
            threads: 1,
            buffer: Vec::new(),
            next_seq: 0,
            scratch: None,
            runs: Vec::new(),
            stats: SortStats::default(),
        }
    }

    /// Set the in-memory record budget. Zero is treated as one.
    #[must_use]
    pub fn max_records_in_ram(mut self, max: usize) -> Self {
        self.max_records_in_ram = max.max(1);
        self
    }

    /// Set the directory in which the scratch directory is created.
    #[must_use]
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = Some(path);
        self
    }

    /// Set the number of threads.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Statistics so far.
    #[must_use]
    pub fn stats(&self) -> SortStats {
        self.stats
    }

    /// Add a record, spilling a run if the buffer reaches the budget.
    ///
    /// # Errors
    /// Returns `Spill` if a run cannot be written
    pub fn add(&mut self, record: RecordBuf) -> Result<()> {
        let key = K::from_record(&record);
        self.buffer.push((key, self.next_seq, record));
        self.next_seq += 1;
        self.stats.total_records += 1;

        if self.buffer.len() >= self.max_records_in_ram {
            self.spill()?;
        }
        Ok(())
    }

    /// Finish accumulating and return the records in sorted order.
    ///
    /// # Errors
    /// Returns `Spill` if the last run cannot be written or a run cannot be reopened
    pub fn finish(mut self) -> Result<SortedRecords<K>> {
        let source = if self.runs.is_empty() {
            self.sort_buffer();
            debug!("Sorted {} records in memory", self.buffer.len());
            let records: Vec<RecordBuf> =
                std::mem::take(&mut self.buffer).into_iter().map(|(_, _, r)| r).collect();
            SortedSource::InMemory(records.into_iter())
        } else if self.buffer.is_empty() && self.runs.len() == 1 {
            debug!("Streaming single sorted run");
            SortedSource::SingleRun(RunReader::open(&self.runs[0], 0)?)
        } else {
            if !self.buffer.is_empty() {
                self.spill()?;
            }
            info!("Merging {} sorted runs", self.runs.len());
            SortedSource::Merge(MergeState::new(&self.runs, &self.header)?)
        };

        Ok(SortedRecords { source, header: self.header, stats: self.stats, scratch: self.scratch })
    }

    fn sort_buffer(&mut self) {
        let by_key_then_arrival =
            |a: &(K, u64, RecordBuf), b: &(K, u64, RecordBuf)| (&a.0, a.1).cmp(&(&b.0, b.1));
        if self.threads > 1 {
            self.buffer.par_sort_unstable_by(by_key_then_arrival);
        } else {
            self.buffer.sort_unstable_by(by_key_then_arrival);
        }
    }

    /// Sort the buffer and write it as the next run.
    fn spill(&mut self) -> Result<()> {
        self.sort_buffer();

        let dir = self.scratch_dir()?;
        let path = dir.join(format!("run_{:04}.bam", self.runs.len()));

        let file = File::create(&path).map_err(spill_error("create", &path))?;
        let mut writer = bam::io::Writer::new(file);
        writer.write_header(&self.header).map_err(spill_error("write", &path))?;
        for (_, _, record) in &self.buffer {
            writer
                .write_alignment_record(&self.header, record)
                .map_err(spill_error("write", &path))?;
        }
        writer.into_inner().finish().map(drop).map_err(spill_error("write", &path))?;

        debug!(
            "Spilled run {} ({} records) to {}",
            self.runs.len(),
            self.buffer.len(),
            path.display()
        );
        self.runs.push(path);
        self.stats.runs_spilled += 1;
        self.buffer.clear();
        Ok(())
    }

    /// The scratch directory, created on first use.
    fn scratch_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.scratch {
            return Ok(dir.path().to_path_buf());
        }
        let mut builder = tempfile::Builder::new();
        builder.prefix("fgrg-sort.");
        let created = match &self.temp_dir {
            Some(base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        };
        let dir = created.map_err(|source| RgError::Spill {
            operation: "create",
            path: self.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            source,
        })?;
        info!("Spilling sorted runs to {}", dir.path().display());
        let path = dir.path().to_path_buf();
        self.scratch = Some(dir);
        Ok(path)
    }
}

fn spill_error<'a>(operation: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> RgError + 'a {
    move |source| RgError::Spill { operation, path: path.to_path_buf(), source }
}

/// How the sorted output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortedKind {
    /// Nothing was spilled; records come straight from the sorted buffer.
    InMemory,
    /// Exactly one run was spilled and nothing was left buffered; the run is streamed back.
    SingleRun,
    /// Several runs are merged with a heap.
    Merge,
}

/// Statistics from a sort operation.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortStats {
    /// Records added to the sorter.
    pub total_records: u64,
    /// Runs written to scratch storage.
    pub runs_spilled: usize,
}

enum SortedSource<K> {
    InMemory(std::vec::IntoIter<RecordBuf>),
    SingleRun(RunReader),
    Merge(MergeState<K>),
}

/// Sorted records, yielded one at a time.
///
/// Owns the scratch directory (if any); it is deleted when this is dropped.
pub struct SortedRecords<K: SortKey> {
    // Declared before `scratch` so run files are closed before the directory is removed.
    source: SortedSource<K>,
    header: Header,
    stats: SortStats,
    scratch: Option<TempDir>,
}

impl<K: SortKey> SortedRecords<K> {
    /// Which of the three output shapes is in use.
    #[must_use]
    pub fn kind(&self) -> SortedKind {
        match self.source {
            SortedSource::InMemory(_) => SortedKind::InMemory,
            SortedSource::SingleRun(_) => SortedKind::SingleRun,
            SortedSource::Merge(_) => SortedKind::Merge,
        }
    }

    #[must_use]
    pub fn stats(&self) -> SortStats {
        self.stats
    }

    /// Path of the scratch directory, if anything was spilled.
    #[must_use]
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }
}

impl<K: SortKey> Iterator for SortedRecords<K> {
    type Item = Result<RecordBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            SortedSource::InMemory(records) => records.next().map(Ok),
            SortedSource::SingleRun(reader) => reader.next(&self.header).transpose(),
            SortedSource::Merge(state) => state.next(&self.header).transpose(),
        }
    }
}

/// Reader for one spilled run.
struct RunReader {
    reader: bam::io::Reader<noodles::bgzf::io::Reader<BufReader<File>>>,
    path: PathBuf,
    idx: usize,
}

impl RunReader {
    fn open(path: &Path, idx: usize) -> Result<Self> {
        let file = File::open(path).map_err(spill_error("read", path))?;
        let mut reader = bam::io::Reader::new(BufReader::with_capacity(MERGE_BUFFER_SIZE, file));

        // Every run carries the sorter's header; skip it.
        reader.read_header().map_err(spill_error("read", path))?;

        Ok(Self { reader, path: path.to_path_buf(), idx })
    }

    fn next(&mut self, header: &Header) -> Result<Option<RecordBuf>> {
        let mut record = RecordBuf::default();
        match self.reader.read_record_buf(header, &mut record) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(record)),
            Err(source) => Err(spill_error("read", &self.path)(source)),
        }
    }
}

/// Entry in the merge heap.
struct HeapEntry<K> {
    key: K,
    run_idx: usize,
    record: RecordBuf,
}

impl<K: Ord> PartialEq for HeapEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord> Eq for HeapEntry<K> {}

impl<K: Ord> PartialOrd for HeapEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for HeapEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key).then_with(|| self.run_idx.cmp(&other.run_idx))
    }
}

struct MergeState<K> {
    readers: Vec<RunReader>,
    heap: BinaryHeap<Reverse<HeapEntry<K>>>,
}

impl<K: SortKey> MergeState<K> {
    fn new(runs: &[PathBuf], header: &Header) -> Result<Self> {
        let mut readers: Vec<RunReader> = runs
            .iter()
            .enumerate()
            .map(|(idx, path)| RunReader::open(path, idx))
            .collect::<Result<Vec<_>>>()?;

        let mut heap = BinaryHeap::with_capacity(readers.len());
        for reader in &mut readers {
            if let Some(record) = reader.next(header)? {
                let key = K::from_record(&record);
                heap.push(Reverse(HeapEntry { key, run_idx: reader.idx, record }));
            }
        }

        Ok(Self { readers, heap })
    }

    fn next(&mut self, header: &Header) -> Result<Option<RecordBuf>> {
        let Some(Reverse(entry)) = self.heap.pop() else {
            return Ok(None);
        };

        let reader = &mut self.readers[entry.run_idx];
        match reader.next(header) {
            Ok(Some(record)) => {
                let key = K::from_record(&record);
                self.heap.push(Reverse(HeapEntry { key, run_idx: reader.idx, record }));
            }
            Ok(None) => {}
            Err(e) => {
                self.heap.clear();
                return Err(e);
            }
        }

        Ok(Some(entry.record))
    }
}

//! The end-to-end rewrite: read, stamp, optionally re-sort, write.
//!
//! [`OrderedEmitter`] picks one of two modes from the input's declared sort order and the
//! requested one ([`EmitMode::choose`]):
//!
//! - **Pass-through**: no order requested, or the requested order equals the input's
//!   declaration. Each record is stamped and written as soon as it is read, in arrival order.
//!   The input's declared order is trusted, not checked: a mis-declared input produces an
//!   equally mis-ordered output.
//! - **Reorder**: every stamped record goes to an [`ExternalSorter`]; nothing reaches the
//!   output until the input is exhausted and the sorted stream begins.
//!
//! The emitter moves through [`EmitterState`]s:
//!
//! ```text
//! Init -> Streaming -> PassThroughDone ----------------> Closed
//!                   \-> Sorting -> MergeEmitting ------/
//! ```
//!
//! Any error moves it to `Failed`. The output sink is dropped unclosed in that case, which
//! for [`crate::bam_io::AlignmentSink`] deletes the partial output.

use std::fmt;
use std::path::PathBuf;

use log::{debug, info};
use noodles::sam::Header;

use crate::bam_io::{RecordSink, RecordSource};
use crate::errors::{Result, RgError};
use crate::header::{declared_sort_order, rewrite_header};
use crate::progress::ProgressTracker;
use crate::read_group::ReadGroupDescriptor;
use crate::sort::{
    CoordinateKey, DEFAULT_MAX_RECORDS_IN_RAM, ExternalSorter, QuerynameKey, SortKey,
    SortKeyKind, SortOrder, SortedKind,
};
use crate::transform::ReadGroupStamper;

/// How records travel from input to output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// Records are written in arrival order as they are read.
    PassThrough,
    /// Records are re-sorted into the given order before being written.
    Reorder(SortOrder),
}

impl EmitMode {
    /// Choose the mode for an input declaring `input` when `requested` is asked for.
    ///
    /// Requesting `unknown` or `unsorted` never re-sorts: those orders place no constraint on
    /// the records, so arrival order already satisfies them.
    #[must_use]
    pub fn choose(input: SortOrder, requested: Option<SortOrder>) -> Self {
        match requested {
            Some(order) if order != input && order.key_kind().is_some() => Self::Reorder(order),
            _ => Self::PassThrough,
        }
    }

    /// Whether records reach the output already in the header's declared order.
    #[must_use]
    pub fn is_presorted(&self) -> bool {
        matches!(self, Self::PassThrough)
    }
}

impl fmt::Display for EmitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassThrough => f.write_str("pass-through"),
            Self::Reorder(order) => write!(f, "reorder to {order}"),
        }
    }
}

/// Lifecycle of an [`OrderedEmitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// Nothing has happened yet.
    Init,
    /// Records are being read and stamped.
    Streaming,
    /// Pass-through finished writing; the sink is being closed.
    PassThroughDone,
    /// Input exhausted in reorder mode; the sorter is finishing its last run.
    Sorting,
    /// Sorted records are being written.
    MergeEmitting,
    /// The sink closed successfully.
    Closed,
    /// An error aborted the run.
    Failed,
}

impl EmitterState {
    fn can_transition_to(self, next: Self) -> bool {
        use EmitterState::{Closed, Failed, Init, MergeEmitting, PassThroughDone, Sorting, Streaming};
        matches!(
            (self, next),
            (Init, Streaming)
                | (Streaming, PassThroughDone | Sorting)
                | (Sorting, MergeEmitting)
                | (PassThroughDone | MergeEmitting, Closed)
                | (Init | Streaming | PassThroughDone | Sorting | MergeEmitting, Failed)
        )
    }
}

/// Tuning for the reorder path.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Records buffered before the sorter spills a run.
    pub max_records_in_ram: usize,
    /// Parent directory for sort scratch space; the system temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Threads for parallel run sorting.
    pub threads: usize,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { max_records_in_ram: DEFAULT_MAX_RECORDS_IN_RAM, temp_dir: None, threads: 1 }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitSummary {
    pub mode: EmitMode,
    pub records_read: u64,
    pub records_written: u64,
    pub runs_spilled: usize,
    /// How the sorted stream was produced; `None` in pass-through mode.
    pub sorted_kind: Option<SortedKind>,
}

/// Drives one rewrite from a [`RecordSource`] to a [`RecordSink`].
pub struct OrderedEmitter {
    read_group: ReadGroupDescriptor,
    stamper: ReadGroupStamper,
    requested: Option<SortOrder>,
    options: EmitOptions,
    state: EmitterState,
}

impl OrderedEmitter {
    #[must_use]
    pub fn new(read_group: &ReadGroupDescriptor, requested: Option<SortOrder>) -> Self {
        Self {
            read_group: read_group.clone(),
            stamper: ReadGroupStamper::new(read_group),
            requested,
            options: EmitOptions::default(),
            state: EmitterState::Init,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EmitOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn state(&self) -> EmitterState {
        self.state
    }

    /// Run the rewrite.
    ///
    /// `open_sink` is called once with the output header and the presorted flag, after the
    /// header has been rewritten and before any record is read.
    ///
    /// # Errors
    /// Any error from the source, the sorter or the sink; the emitter is left `Failed`
    pub fn run<S, W, F>(
        &mut self,
        source: &mut S,
        open_sink: F,
        progress: &ProgressTracker,
    ) -> Result<EmitSummary>
    where
        S: RecordSource,
        W: RecordSink,
        F: FnOnce(&Header, bool) -> Result<W>,
    {
        let result = self.run_inner(source, open_sink, progress);
        if result.is_err() {
            self.transition(EmitterState::Failed);
        }
        result
    }

    fn run_inner<S, W, F>(
        &mut self,
        source: &mut S,
        open_sink: F,
        progress: &ProgressTracker,
    ) -> Result<EmitSummary>
    where
        S: RecordSource,
        W: RecordSink,
        F: FnOnce(&Header, bool) -> Result<W>,
    {
        let declared = declared_sort_order(source.header());
        let mode = EmitMode::choose(declared, self.requested);
        let header = rewrite_header(source.header(), &self.read_group, self.requested)?;
        info!("Input declares sort order '{declared}'; emitting in {mode} mode");

        let mut sink = open_sink(&header, mode.is_presorted())?;
        let progress_start = progress.count();
        self.transition(EmitterState::Streaming);

        let (records_read, runs_spilled, sorted_kind) = match mode {
            EmitMode::PassThrough => {
                let read = self.pass_through(source, &mut sink, &header, progress)?;
                self.transition(EmitterState::PassThroughDone);
                (read, 0, None)
            }
            EmitMode::Reorder(order) => {
                let (read, runs, kind) = match order.key_kind() {
                    Some(SortKeyKind::Queryname) => {
                        self.reorder::<QuerynameKey, _, _>(source, &mut sink, &header, progress)?
                    }
                    Some(SortKeyKind::Coordinate) | None => {
                        self.reorder::<CoordinateKey, _, _>(source, &mut sink, &header, progress)?
                    }
                };
                (read, runs, Some(kind))
            }
        };

        // Checked before close so a short output is dropped, never persisted.
        let records_written = sink.records_written();
        let counted = progress.count() - progress_start;
        if records_written != records_read || counted != records_read {
            return Err(RgError::RecordCountMismatch { read: records_read, written: records_written });
        }
        sink.close()?;
        self.transition(EmitterState::Closed);

        Ok(EmitSummary { mode, records_read, records_written, runs_spilled, sorted_kind })
    }

    fn pass_through<S: RecordSource, W: RecordSink>(
        &self,
        source: &mut S,
        sink: &mut W,
        header: &Header,
        progress: &ProgressTracker,
    ) -> Result<u64> {
        let mut read = 0;
        while let Some(mut record) = source.next_record()? {
            read += 1;
            self.stamper.stamp(&mut record);
            progress.record(&record, header);
            sink.write_record(&record)?;
        }
        Ok(read)
    }

    fn reorder<K: SortKey, S: RecordSource, W: RecordSink>(
        &mut self,
        source: &mut S,
        sink: &mut W,
        header: &Header,
        progress: &ProgressTracker,
    ) -> Result<(u64, usize, SortedKind)> {
        let mut sorter = ExternalSorter::<K>::new(header.clone())
            .max_records_in_ram(self.options.max_records_in_ram)
            .threads(self.options.threads);
        if let Some(dir) = &self.options.temp_dir {
            sorter = sorter.temp_dir(dir.clone());
        }

        let mut read = 0;
        while let Some(record) = source.next_record()? {
            read += 1;
            let record = self.stamper.apply(record);
            progress.record(&record, header);
            sorter.add(record)?;
        }

        self.transition(EmitterState::Sorting);
        let sorted = sorter.finish()?;
        let kind = sorted.kind();
        let runs = sorted.stats().runs_spilled;

        self.transition(EmitterState::MergeEmitting);
        for record in sorted {
            sink.write_record(&record?)?;
        }
        Ok((read, runs, kind))
    }

    fn transition(&mut self, next: EmitterState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid emitter transition {:?} -> {next:?}",
            self.state
        );
        debug!("Emitter state {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

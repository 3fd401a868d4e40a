//! Assign every record in a SAM/BAM file to a single new read group.
//!
//! All existing `@RG` header lines are replaced by one describing the new read group, and
//! every record's `RG` tag is set to its ID. The output can optionally be re-sorted.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use fgrg_lib::bam_io::{AlignmentSink, AlignmentSource};
use fgrg_lib::emitter::{EmitOptions, OrderedEmitter};
use fgrg_lib::logging::{OperationTimer, log_emit_summary};
use fgrg_lib::progress::ProgressTracker;
use fgrg_lib::sort::{DEFAULT_MAX_RECORDS_IN_RAM, SortOrder};
use fgrg_lib::validation::validate_positive;

use crate::commands::command::Command;
use crate::commands::common::{AlignmentIoOptions, ReadGroupOptions, SortOrderArg};

/// Add or replace read groups in a SAM/BAM file.
#[derive(Debug, Parser)]
#[command(
    name = "add-or-replace-read-groups",
    visible_alias = "replace-rg",
    about = "\x1b[38;5;166m[READ GROUPS]\x1b[0m    \x1b[36mAssign all reads to a single new read group\x1b[0m",
    long_about = r#"
Replace all read groups in a SAM/BAM file with a single new read group.

The output header contains exactly one @RG line, built from the options below, and every
record's RG tag is set to the new read group ID. All other header lines and record fields
are kept.

SORT ORDER:

  Without --sort-order the output keeps the input's order and its declared SO. When
  --sort-order differs from the input's declared order, records are re-sorted (spilling to
  --tmp-dir when more than --max-records-in-ram records are buffered). The input's declared
  order is trusted: it is not checked against the records.

EXAMPLES:

  # Assign a read group, keeping the input order
  fgrg add-or-replace-read-groups -i in.bam -o out.bam \
    --library lib1 --platform ILLUMINA --platform-unit HXXX.1 --sample NA12878

  # Assign a read group and coordinate sort the output
  fgrg replace-rg -i in.sam -o out.bam --id A --library lib1 --platform ILLUMINA \
    --platform-unit HXXX.1 --sample NA12878 --sort-order coordinate
"#
)]
pub struct AddOrReplaceReadGroups {
    #[command(flatten)]
    pub io: AlignmentIoOptions,

    #[command(flatten)]
    pub read_group: ReadGroupOptions,

    /// Sort order of the output. Defaults to the input's order.
    #[arg(long = "sort-order", alias = "SORT_ORDER", value_enum)]
    pub sort_order: Option<SortOrderArg>,

    /// Number of records to hold in memory before spilling a sorted run to disk.
    #[arg(long = "max-records-in-ram", default_value_t = DEFAULT_MAX_RECORDS_IN_RAM)]
    pub max_records_in_ram: usize,

    /// Temporary directory for sorted runs.
    ///
    /// If not specified, uses the system default temp directory.
    #[arg(short = 'T', long = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,

    /// Number of threads for BGZF compression and parallel sorting.
    #[arg(short = '@', short_alias = 't', long = "threads", default_value = "1")]
    pub threads: usize,
}

impl Command for AddOrReplaceReadGroups {
    fn execute(&self, _command_line: &str) -> Result<()> {
        let read_group = self.read_group.to_fields().validate()?;
        validate_positive(self.max_records_in_ram, "max-records-in-ram")?;
        self.io.validate()?;

        let timer = OperationTimer::new("Replacing read groups");
        info!("Input: {}", self.io.input.display());
        info!("Output: {}", self.io.output.display());

        let mut source = AlignmentSource::open(&self.io.input, self.threads)?;
        info!("Created read group {}", read_group.summary());

        let requested = self.sort_order.map(SortOrder::from);
        let options = EmitOptions {
            max_records_in_ram: self.max_records_in_ram,
            temp_dir: self.tmp_dir.clone(),
            threads: self.threads.max(1),
        };
        let progress = ProgressTracker::new("Processed");
        let output = &self.io.output;
        let threads = self.threads;

        let summary = OrderedEmitter::new(&read_group, requested)
            .with_options(options)
            .run(
                &mut source,
                |header, presorted| AlignmentSink::create(output, header, presorted, threads),
                &progress,
            )
            .with_context(|| format!("Failed to rewrite {}", self.io.input.display()))?;

        progress.log_final();
        log_emit_summary(&summary);
        timer.log_completion(summary.records_written);
        Ok(())
    }
}

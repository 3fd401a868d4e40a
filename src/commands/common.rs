//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use fgrg_lib::read_group::{DEFAULT_READ_GROUP_ID, ReadGroupFields};
use fgrg_lib::sort::SortOrder;
use fgrg_lib::validation::{validate_input_readable, validate_output_writable};

/// Input/output options for commands that read a SAM/BAM and write a SAM/BAM.
#[derive(Debug, Clone, Args)]
pub struct AlignmentIoOptions {
    /// Input SAM or BAM file
    #[arg(short = 'i', long = "input", alias = "INPUT")]
    pub input: PathBuf,

    /// Output SAM or BAM file (SAM if the name ends in .sam)
    #[arg(short = 'o', long = "output", alias = "OUTPUT")]
    pub output: PathBuf,
}

impl AlignmentIoOptions {
    /// Validates that the input can be read and the output can be created.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is missing or unreadable, or the output's directory
    /// does not exist.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_input_readable(&self.input)?;
        validate_output_writable(&self.output)?;
        Ok(())
    }
}

/// The read group to assign to every record.
#[derive(Debug, Clone, Args)]
pub struct ReadGroupOptions {
    /// Read group ID
    #[arg(long = "id", alias = "RGID", default_value = DEFAULT_READ_GROUP_ID)]
    pub id: String,

    /// Read group library
    #[arg(long = "library", alias = "RGLB")]
    pub library: String,

    /// Read group platform (e.g. ILLUMINA, SOLID)
    #[arg(long = "platform", alias = "RGPL")]
    pub platform: String,

    /// Read group platform unit (e.g. run barcode)
    #[arg(long = "platform-unit", alias = "RGPU")]
    pub platform_unit: String,

    /// Read group sample name
    #[arg(long = "sample", alias = "RGSM")]
    pub sample: String,

    /// Read group sequencing center name
    #[arg(long = "sequencing-center", alias = "RGCN")]
    pub sequencing_center: Option<String>,

    /// Read group description
    #[arg(long = "description", alias = "RGDS")]
    pub description: Option<String>,

    /// Read group run date, as an ISO-8601 date or date-time
    #[arg(long = "run-date", alias = "RGDT")]
    pub run_date: Option<String>,

    /// Read group key sequence
    #[arg(long = "key-sequence", alias = "RGKS")]
    pub key_sequence: Option<String>,

    /// Read group flow order
    #[arg(long = "flow-order", alias = "RGFO")]
    pub flow_order: Option<String>,

    /// Read group predicted insert size
    #[arg(long = "predicted-insert-size", alias = "RGPI")]
    pub predicted_insert_size: Option<u32>,

    /// Read group program group
    #[arg(long = "program-group", alias = "RGPG")]
    pub program_group: Option<String>,

    /// Read group platform model
    #[arg(long = "platform-model", alias = "RGPM")]
    pub platform_model: Option<String>,
}

impl ReadGroupOptions {
    /// The unvalidated read group fields these options describe.
    #[must_use]
    pub fn to_fields(&self) -> ReadGroupFields {
        ReadGroupFields {
            id: self.id.clone(),
            sample: self.sample.clone(),
            library: self.library.clone(),
            platform: self.platform.clone(),
            platform_unit: self.platform_unit.clone(),
            sequencing_center: self.sequencing_center.clone(),
            description: self.description.clone(),
            run_date: self.run_date.clone(),
            key_sequence: self.key_sequence.clone(),
            flow_order: self.flow_order.clone(),
            predicted_insert_size: self.predicted_insert_size,
            program_group: self.program_group.clone(),
            platform_model: self.platform_model.clone(),
        }
    }
}

/// Sort order that can be requested for the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrderArg {
    /// Order is unknown
    Unknown,
    /// Records are in no particular order
    Unsorted,
    /// Sort by read name (byte-wise)
    Queryname,
    /// Sort by reference, then position
    Coordinate,
    /// Duplicate-marking order (sorted by coordinate)
    Duplicate,
}

impl From<SortOrderArg> for SortOrder {
    fn from(arg: SortOrderArg) -> Self {
        match arg {
            SortOrderArg::Unknown => SortOrder::Unknown,
            SortOrderArg::Unsorted => SortOrder::Unsorted,
            SortOrderArg::Queryname => SortOrder::Queryname,
            SortOrderArg::Coordinate => SortOrder::Coordinate,
            SortOrderArg::Duplicate => SortOrder::Duplicate,
        }
    }
}

//! The single replacement read group.
//!
//! [`ReadGroupFields`] holds raw, unvalidated configuration. [`ReadGroupFields::validate`]
//! checks every free-text field (collecting all failures) and produces an immutable
//! [`ReadGroupDescriptor`], which is the only form the rest of the pipeline accepts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::ReadGroup;
use noodles::sam::header::record::value::map::builder::Builder;
use noodles::sam::header::record::value::map::read_group::tag as rg_tag;

use crate::errors::{Result, RgError};
use crate::validation::validate_tag_values;

/// Read group ID used when none is given.
pub const DEFAULT_READ_GROUP_ID: &str = "1";

/// The `DT` value of a read group: a calendar date or a full ISO-8601 date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDate {
    /// `YYYY-MM-DD`
    Date(NaiveDate),
    /// RFC 3339 date-time with offset, e.g. `2024-01-01T08:30:00+00:00`
    DateTime(DateTime<FixedOffset>),
}

impl FromStr for RunDate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::Date(date));
        }
        DateTime::parse_from_rfc3339(s).map(Self::DateTime).map_err(|_| {
            format!("DT must be an ISO-8601 date (YYYY-MM-DD) or date-time, got: {s:?}")
        })
    }
}

impl fmt::Display for RunDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// Unvalidated read group configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadGroupFields {
    /// ID
    pub id: String,
    /// SM
    pub sample: String,
    /// LB
    pub library: String,
    /// PL
    pub platform: String,
    /// PU
    pub platform_unit: String,
    /// CN
    pub sequencing_center: Option<String>,
    /// DS
    pub description: Option<String>,
    /// DT, parsed during validation
    pub run_date: Option<String>,
    /// KS
    pub key_sequence: Option<String>,
    /// FO
    pub flow_order: Option<String>,
    /// PI
    pub predicted_insert_size: Option<u32>,
    /// PG
    pub program_group: Option<String>,
    /// PM
    pub platform_model: Option<String>,
}

impl Default for ReadGroupFields {
    fn default() -> Self {
        Self {
            id: DEFAULT_READ_GROUP_ID.to_string(),
            sample: String::new(),
            library: String::new(),
            platform: String::new(),
            platform_unit: String::new(),
            sequencing_center: None,
            description: None,
            run_date: None,
            key_sequence: None,
            flow_order: None,
            predicted_insert_size: None,
            program_group: None,
            platform_model: None,
        }
    }
}

impl ReadGroupFields {
    /// The free-text fields, keyed by their SAM tag, in validation order.
    fn free_text(&self) -> [(&'static str, Option<&str>); 11] {
        [
            ("ID", Some(self.id.as_str())),
            ("LB", Some(self.library.as_str())),
            ("PL", Some(self.platform.as_str())),
            ("PU", Some(self.platform_unit.as_str())),
            ("SM", Some(self.sample.as_str())),
            ("CN", self.sequencing_center.as_deref()),
            ("DS", self.description.as_deref()),
            ("KS", self.key_sequence.as_deref()),
            ("FO", self.flow_order.as_deref()),
            ("PG", self.program_group.as_deref()),
            ("PM", self.platform_model.as_deref()),
        ]
    }

    /// Validates every field and builds the descriptor.
    ///
    /// All failures are reported together, including an unparseable run date.
    ///
    /// # Errors
    /// Returns `InvalidTagValues` listing each failing field
    pub fn validate(self) -> Result<ReadGroupDescriptor> {
        let mut messages = match validate_tag_values(self.free_text()) {
            Ok(()) => Vec::new(),
            Err(RgError::InvalidTagValues { messages }) => messages,
            Err(e) => return Err(e),
        };

        let run_date = match self.run_date.as_deref().map(RunDate::from_str).transpose() {
            Ok(date) => date,
            Err(message) => {
                messages.push(message);
                None
            }
        };

        if !messages.is_empty() {
            return Err(RgError::InvalidTagValues { messages });
        }

        Ok(ReadGroupDescriptor {
            id: self.id,
            sample: self.sample,
            library: self.library,
            platform: self.platform,
            platform_unit: self.platform_unit,
            sequencing_center: self.sequencing_center,
            description: self.description,
            run_date,
            key_sequence: self.key_sequence,
            flow_order: self.flow_order,
            predicted_insert_size: self.predicted_insert_size,
            program_group: self.program_group,
            platform_model: self.platform_model,
        })
    }
}

/// A validated read group. Immutable; build one through [`ReadGroupFields::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadGroupDescriptor {
    id: String,
    sample: String,
    library: String,
    platform: String,
    platform_unit: String,
    sequencing_center: Option<String>,
    description: Option<String>,
    run_date: Option<RunDate>,
    key_sequence: Option<String>,
    flow_order: Option<String>,
    predicted_insert_size: Option<u32>,
    program_group: Option<String>,
    platform_model: Option<String>,
}

fn add_to_read_group(
    rg: Builder<ReadGroup>,
    tag: noodles::sam::header::record::value::map::tag::Other<rg_tag::Standard>,
    value: Option<String>,
) -> Builder<ReadGroup> {
    if let Some(v) = value { rg.insert(tag, v) } else { rg }
}

impl ReadGroupDescriptor {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn sample(&self) -> &str {
        &self.sample
    }

    #[must_use]
    pub fn library(&self) -> &str {
        &self.library
    }

    #[must_use]
    pub fn predicted_insert_size(&self) -> Option<u32> {
        self.predicted_insert_size
    }

    /// Builds the `@RG` header map (everything except `ID`, which is the map's key).
    ///
    /// # Errors
    /// Returns `InvalidParameter` if noodles rejects the map
    pub fn to_header_map(&self) -> Result<Map<ReadGroup>> {
        let mut rg = Map::<ReadGroup>::builder();
        rg = add_to_read_group(rg, rg_tag::SAMPLE, Some(self.sample.clone()));
        rg = add_to_read_group(rg, rg_tag::LIBRARY, Some(self.library.clone()));
        rg = add_to_read_group(rg, rg_tag::PLATFORM, Some(self.platform.clone()));
        rg = add_to_read_group(rg, rg_tag::PLATFORM_UNIT, Some(self.platform_unit.clone()));
        rg = add_to_read_group(rg, rg_tag::PLATFORM_MODEL, self.platform_model.clone());
        rg = add_to_read_group(rg, rg_tag::SEQUENCING_CENTER, self.sequencing_center.clone());
        rg = add_to_read_group(
            rg,
            rg_tag::PREDICTED_MEDIAN_INSERT_SIZE,
            self.predicted_insert_size.map(|i| i.to_string()),
        );
        rg = add_to_read_group(rg, rg_tag::DESCRIPTION, self.description.clone());
        rg = add_to_read_group(rg, rg_tag::PRODUCED_AT, self.run_date.map(|d| d.to_string()));
        rg = add_to_read_group(rg, rg_tag::KEY_SEQUENCE, self.key_sequence.clone());
        rg = add_to_read_group(rg, rg_tag::FLOW_ORDER, self.flow_order.clone());
        rg = add_to_read_group(rg, rg_tag::PROGRAM, self.program_group.clone());
        rg.build().map_err(|e| RgError::invalid_parameter("read group", e.to_string()))
    }

    /// Short form used in log messages: `ID=.. PL=.. LB=.. SM=..`
    #[must_use]
    pub fn summary(&self) -> String {
        format!("ID={} PL={} LB={} SM={}", self.id, self.platform, self.library, self.sample)
    }
}

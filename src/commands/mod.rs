//! CLI command implementations for fgrg.
//!
//! - [`add_or_replace_read_groups`] - Assign all reads to a single new read group, optionally
//!   re-sorting the output

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

pub mod add_or_replace_read_groups;
pub mod command;
pub mod common;

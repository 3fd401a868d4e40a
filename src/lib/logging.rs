//! Logging utilities for formatted output.
//!
//! Consistent formatting of counts, durations and rates, plus the run summary logged at
//! the end of a rewrite.

use std::time::{Duration, Instant};

use crate::emitter::{EmitMode, EmitSummary};

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use fgrg_lib::logging::format_count;
///
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(123), "123");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a duration in human-readable form (e.g. "2m 15s", "1h 30m", "45s").
///
/// # Examples
///
/// ```
/// use fgrg_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a record rate (e.g. "1,234 records/s", "10.0 records/min").
///
/// # Examples
///
/// ```
/// use fgrg_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 records/s");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} records/s", format_count(count));
    }

    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} records/s", format_count(rate as u64))
    } else {
        let per_min = count as f64 / (secs / 60.0);
        format!("{per_min:.1} records/min")
    }
}

/// Logs the outcome of a rewrite.
pub fn log_emit_summary(summary: &EmitSummary) {
    let mode = match summary.mode {
        EmitMode::PassThrough => "pass-through".to_string(),
        EmitMode::Reorder(order) => format!("re-sorted to {order}"),
    };
    log::info!("Rewrite summary ({mode}):");
    if let Some(kind) = summary.sorted_kind {
        log::debug!("  Sorted output produced via {kind:?}");
    }
    log::info!("  Records read:    {}", format_count(summary.records_read));
    log::info!("  Records written: {}", format_count(summary.records_written));
    if summary.runs_spilled > 0 {
        log::info!("  Sort runs spilled to disk: {}", summary.runs_spilled);
    }
}

/// Times an operation and logs its start and completion.
///
/// ```
/// use fgrg_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Rewriting read groups");
/// // ... do work ...
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with record count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} records in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}

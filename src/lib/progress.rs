//! Progress tracking utilities
//!
//! [`ProgressTracker`] counts records handed to it and logs every `interval` records with
//! the elapsed time and, when the caller supplies the record, its position.

use log::info;
use noodles::sam::Header;
use noodles::sam::alignment::record_buf::RecordBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::logging::{format_count, format_duration};

/// Default number of records between progress messages.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Thread-safe progress tracker for logging progress at regular intervals.
///
/// The count is monotonic: it only grows, by exactly the amount each call adds.
///
/// # Example
/// ```
/// use fgrg_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Read").with_interval(100);
///
/// for _ in 0..250 {
///     tracker.log_if_needed(1);  // Logs at 100, 200
/// }
/// tracker.log_final();  // Logs "Read 250 records (complete)"
/// assert_eq!(tracker.count(), 250);
/// ```
pub struct ProgressTracker {
    /// The logging interval - progress is logged when count crosses multiples of this.
    interval: u64,
    /// Verb prefix for log output, e.g. "Read".
    message: String,
    /// Internal count of items processed (thread-safe).
    count: AtomicU64,
    start: Instant,
}

impl ProgressTracker {
    /// Create a new progress tracker with the default interval of 1,000,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            interval: DEFAULT_PROGRESS_INTERVAL,
            message: message.into(),
            count: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Set the logging interval. Zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Add to the count and log if an interval boundary was crossed.
    ///
    /// # Returns
    /// `true` if the final count is exactly a multiple of the interval
    pub fn log_if_needed(&self, additional: u64) -> bool {
        self.advance(additional, None)
    }

    /// Count one record, logging its position if this record crosses an interval boundary.
    pub fn record(&self, record: &RecordBuf, header: &Header) -> bool {
        self.advance(1, Some((record, header)))
    }

    fn advance(&self, additional: u64, last: Option<(&RecordBuf, &Header)>) -> bool {
        if additional == 0 {
            let count = self.count.load(Ordering::Relaxed);
            return count > 0 && count.is_multiple_of(self.interval);
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        let prev_intervals = prev / self.interval;
        let new_intervals = new_count / self.interval;

        for i in (prev_intervals + 1)..=new_intervals {
            let milestone = i * self.interval;
            let elapsed = format_duration(self.start.elapsed());
            match last {
                Some((record, header)) => info!(
                    "{} {} records. Elapsed time: {}. Last read position: {}",
                    self.message,
                    format_count(milestone),
                    elapsed,
                    record_position(record, header)
                ),
                None => info!(
                    "{} {} records. Elapsed time: {}",
                    self.message,
                    format_count(milestone),
                    elapsed
                ),
            }
        }

        new_count.is_multiple_of(self.interval)
    }

    /// Log final progress unless the last interval message already reported it.
    pub fn log_final(&self) {
        if !self.log_if_needed(0) {
            let count = self.count.load(Ordering::Relaxed);
            if count > 0 {
                info!("{} {} records (complete)", self.message, format_count(count));
            }
        }
    }

    /// Get the current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// `name:pos` for placed records, `*/*` otherwise.
#[must_use]
pub fn record_position(record: &RecordBuf, header: &Header) -> String {
    let name = record
        .reference_sequence_id()
        .and_then(|id| header.reference_sequences().get_index(id))
        .map(|(name, _)| name.to_string());
    match (name, record.alignment_start()) {
        (Some(name), Some(pos)) => format!("{name}:{}", usize::from(pos)),
        (Some(name), None) => format!("{name}:*"),
        _ => "*/*".to_string(),
    }
}

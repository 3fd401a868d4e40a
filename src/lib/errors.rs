//! Custom error types for fgrg operations.
//!
//! Every variant is fatal: nothing in the rewrite pipeline is retried, and a failure after
//! the output sink was opened causes the staged output to be discarded.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for fgrg operations
pub type Result<T> = std::result::Result<T, RgError>;

/// Error type for fgrg operations
#[derive(Error, Debug)]
pub enum RgError {
    /// One or more free-text read group fields failed validation.
    ///
    /// All failing fields are reported together.
    #[error("Invalid read group values:\n  {}", messages.join("\n  "))]
    InvalidTagValues {
        /// One message per failing field
        messages: Vec<String>,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// The input could not be opened or its header could not be read
    #[error("Cannot read input '{}': {source}", path.display())]
    Source {
        /// Path to the input
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record could not be decoded from the input
    #[error("Failed to decode record {record_number} from '{}': {source}", path.display())]
    Decode {
        /// Path to the input
        path: PathBuf,
        /// 1-based number of the record that failed
        record_number: u64,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Scratch storage for the external sort could not be written or read back
    #[error("Failed to {operation} sort run '{}': {source}", path.display())]
    Spill {
        /// What was being done ("create", "write", "read", ...)
        operation: &'static str,
        /// Path to the run file or scratch directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The output could not be created or written
    #[error("Failed to write output '{}': {source}", path.display())]
    Encode {
        /// Path to the output
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Fewer (or more) records were written than were read
    #[error("Record count mismatch: read {read} records but wrote {written}")]
    RecordCountMismatch {
        /// Records read from the input
        read: u64,
        /// Records handed to the output
        written: u64,
    },
}

impl RgError {
    /// Builds an `InvalidParameter` error.
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { parameter: parameter.into(), reason: reason.into() }
    }
}

//! Sort orders, sort keys and the external sorter used when the output order differs from
//! the input's.
//!
//! # Architecture
//!
//! 1. **Key extraction**: [`SortKey::from_record`] builds a [`CoordinateKey`] or
//!    [`QuerynameKey`] from each record
//! 2. **Accumulate / spill**: [`ExternalSorter`] buffers records up to a budget and writes
//!    sorted runs to scratch storage
//! 3. **Merge**: [`SortedRecords`] yields the final order from memory, a single run, or a
//!    heap merge of all runs

pub mod external;
pub mod keys;

pub use external::{
    DEFAULT_MAX_RECORDS_IN_RAM, ExternalSorter, SortStats, SortedKind, SortedRecords,
};
pub use keys::{CoordinateKey, QuerynameKey, SortKey, SortKeyKind, SortOrder};

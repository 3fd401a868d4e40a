//! Sort orders and the sort keys extracted from records.
//!
//! # Key Types
//!
//! - [`CoordinateKey`]: reference index, alignment start, unmapped last
//! - [`QuerynameKey`]: read name, compared byte-wise
//!
//! Neither key breaks ties itself. The sorter pairs every key with the record's arrival
//! sequence number, so records with equal keys keep their input order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use noodles::sam::alignment::record_buf::RecordBuf;

/// Sort order declared in the `SO` field of the `@HD` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// No `SO` field, or a value this crate doesn't recognise
    Unknown,
    /// Records are in no particular order
    Unsorted,
    /// Read name order
    Queryname,
    /// Genomic coordinate order
    Coordinate,
    /// Duplicate-marking order.
    ///
    /// Re-sorting to this order uses [`CoordinateKey`]. htsjdk's duplicate comparator
    /// (library, then mate-aware unclipped 5' positions) is not implemented, so a re-sorted
    /// `SO:duplicate` output is in coordinate order, not the order htsjdk would produce.
    Duplicate,
}

/// The comparator a reordering sort uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKeyKind {
    /// [`CoordinateKey`]
    Coordinate,
    /// [`QuerynameKey`]
    Queryname,
}

impl SortOrder {
    /// Get the SAM header sort order tag value.
    #[must_use]
    pub fn header_so_tag(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Unsorted => "unsorted",
            Self::Queryname => "queryname",
            Self::Coordinate => "coordinate",
            Self::Duplicate => "duplicate",
        }
    }

    /// Parses an `SO` value; anything unrecognised is `Unknown`.
    #[must_use]
    pub fn from_so_tag(value: &[u8]) -> Self {
        match value {
            b"unsorted" => Self::Unsorted,
            b"queryname" => Self::Queryname,
            b"coordinate" => Self::Coordinate,
            b"duplicate" => Self::Duplicate,
            _ => Self::Unknown,
        }
    }

    /// The comparator for this order, or `None` if the order imposes nothing on the records.
    #[must_use]
    pub fn key_kind(&self) -> Option<SortKeyKind> {
        match self {
            Self::Coordinate | Self::Duplicate => Some(SortKeyKind::Coordinate),
            Self::Queryname => Some(SortKeyKind::Queryname),
            Self::Unknown | Self::Unsorted => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_so_tag())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "unsorted" => Ok(Self::Unsorted),
            "queryname" => Ok(Self::Queryname),
            "coordinate" => Ok(Self::Coordinate),
            "duplicate" => Ok(Self::Duplicate),
            _ => Err(format!("Unknown sort order: {s}")),
        }
    }
}

/// Trait for sort keys that can be extracted from records.
pub trait SortKey: Ord + Clone + Send + Sync {
    /// Extract a sort key from a record.
    fn from_record(record: &RecordBuf) -> Self;
}

// ============================================================================
// Coordinate Sort Key
// ============================================================================

/// Sort key for coordinate ordering.
///
/// Sort order: reference index → alignment start → unmapped flag.
/// Records without a reference (`*`) sort after every placed record.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoordinateKey {
    /// Reference sequence index, or `usize::MAX` when unplaced.
    pub tid: usize,
    /// 1-based alignment start, or 0 when absent.
    pub pos: usize,
    /// True if the record is unmapped.
    pub unmapped: bool,
}

impl CoordinateKey {
    /// Key for a record with no reference and no position.
    #[must_use]
    pub fn unplaced() -> Self {
        Self { tid: usize::MAX, pos: 0, unmapped: true }
    }
}

impl Ord for CoordinateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tid
            .cmp(&other.tid)
            .then_with(|| self.pos.cmp(&other.pos))
            .then_with(|| self.unmapped.cmp(&other.unmapped))
    }
}

impl PartialOrd for CoordinateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl SortKey for CoordinateKey {
    fn from_record(record: &RecordBuf) -> Self {
        let unmapped = record.flags().is_unmapped();
        match record.reference_sequence_id() {
            Some(tid) => {
                let pos = record.alignment_start().map_or(0, usize::from);
                Self { tid, pos, unmapped }
            }
            None => Self { unmapped, ..Self::unplaced() },
        }
    }
}

// ============================================================================
// Queryname Sort Key
// ============================================================================

/// Sort key for queryname ordering.
///
/// Names compare as raw bytes, so `read10` sorts before `read2`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct QuerynameKey {
    /// Read name bytes (empty when the record has no name).
    pub name: Vec<u8>,
}

impl SortKey for QuerynameKey {
    fn from_record(record: &RecordBuf) -> Self {
        let name =
            record.name().map_or_else(Vec::new, |n| Vec::from(<_ as AsRef<[u8]>>::as_ref(n)));
        Self { name }
    }
}

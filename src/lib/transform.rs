//! Per-record read group stamping.

use bstr::BString;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::alignment::record_buf::data::field::Value as BufValue;

use crate::read_group::ReadGroupDescriptor;

/// Sets the `RG` tag of every record it sees to one read group ID.
///
/// An existing `RG` value is overwritten in place, so the position of the tag among the
/// record's other data fields doesn't change and re-stamping a record is a no-op.
#[derive(Debug, Clone)]
pub struct ReadGroupStamper {
    id: BString,
}

impl ReadGroupStamper {
    #[must_use]
    pub fn new(read_group: &ReadGroupDescriptor) -> Self {
        Self { id: BString::from(read_group.id()) }
    }

    /// Stamps `record` in place.
    pub fn stamp(&self, record: &mut RecordBuf) {
        record.data_mut().insert(Tag::READ_GROUP, BufValue::String(self.id.clone()));
    }

    /// Stamps and returns `record`.
    #[must_use]
    pub fn apply(&self, mut record: RecordBuf) -> RecordBuf {
        self.stamp(&mut record);
        record
    }
}

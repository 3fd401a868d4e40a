//! Output header construction.
//!
//! [`rewrite_header`] copies the input header (reference sequences, `@PG`, `@CO` and every
//! `@HD` field) and then replaces the whole `@RG` list with the single new read group.
//!
//! The replacement is deliberately lossy: every record is reassigned to the new group, so
//! whatever distinguished the input's read groups (samples, libraries, platform units) is
//! dropped from the output and cannot be recovered from it.

use bstr::BString;
use noodles::sam::Header;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::header::tag::SORT_ORDER;

use crate::errors::Result;
use crate::read_group::ReadGroupDescriptor;
use crate::sort::SortOrder;

/// The sort order declared by the header's `@HD SO` field.
///
/// A header with no `@HD` line, or an `@HD` line without `SO`, declares `Unknown`.
#[must_use]
pub fn declared_sort_order(header: &Header) -> SortOrder {
    header
        .header()
        .and_then(|hd| hd.other_fields().get(&SORT_ORDER))
        .map_or(SortOrder::Unknown, |so| SortOrder::from_so_tag(so))
}

/// Sets `@HD SO`, adding an `@HD` line if the header has none.
pub fn set_sort_order(header: &mut Header, sort_order: SortOrder) {
    let hd = header.header_mut().get_or_insert_with(Map::default);
    hd.other_fields_mut().insert(SORT_ORDER, BString::from(sort_order.header_so_tag()));
}

/// Builds the output header.
///
/// The result has exactly one read group, `read_group`. Its declared sort order is
/// `requested` when given, otherwise the input's declaration is left untouched.
///
/// # Errors
/// Returns an error if the read group cannot be turned into a header record
pub fn rewrite_header(
    input: &Header,
    read_group: &ReadGroupDescriptor,
    requested: Option<SortOrder>,
) -> Result<Header> {
    let mut header = input.clone();

    let read_groups = header.read_groups_mut();
    read_groups.clear();
    read_groups.insert(BString::from(read_group.id()), read_group.to_header_map()?);

    if let Some(sort_order) = requested {
        set_sort_order(&mut header, sort_order);
    }

    Ok(header)
}

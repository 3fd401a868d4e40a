//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

use fgrg_lib::sort::{CoordinateKey, QuerynameKey, SortKey};
use noodles::sam::Header;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::alignment::record_buf::data::field::Value;

/// Asserts that every record's RG tag is `expected`.
///
/// # Panics
///
/// Panics if any RG tag is missing or has another value.
pub fn assert_all_rg(records: &[RecordBuf], expected: &str) {
    for record in records {
        match record.data().get(&Tag::READ_GROUP) {
            Some(Value::String(s)) => {
                let bytes: &[u8] = s.as_ref();
                assert_eq!(bytes, expected.as_bytes(), "RG mismatch for {:?}", record.name());
            }
            other => panic!("RG should be a string on {:?}, got {other:?}", record.name()),
        }
    }
}

/// Asserts that the header carries exactly one read group, with ID `id`.
pub fn assert_single_read_group(header: &Header, id: &str) {
    let groups = header.read_groups();
    assert_eq!(groups.len(), 1, "expected exactly one @RG");
    let (actual, _) = groups.first().expect("one read group");
    assert_eq!(actual.to_string(), id);
}

/// Asserts that `records` are in non-decreasing order by `K`, and that records with equal
/// keys are in the order given by `arrival` (the index a record had in the input).
pub fn assert_sorted_stable<K: SortKey, F>(records: &[RecordBuf], arrival: F)
where
    F: Fn(&RecordBuf) -> usize,
{
    for (i, pair) in records.windows(2).enumerate() {
        let a = K::from_record(&pair[0]);
        let b = K::from_record(&pair[1]);
        assert!(a <= b, "records {i} and {} are out of order", i + 1);
        if a == b {
            assert!(
                arrival(&pair[0]) < arrival(&pair[1]),
                "equal keys at {i} and {} are not in arrival order",
                i + 1
            );
        }
    }
}

/// Asserts coordinate order with arrival-order ties, reading arrival from the `XI` tag.
pub fn assert_coordinate_sorted(records: &[RecordBuf]) {
    assert_sorted_stable::<CoordinateKey, _>(records, arrival_index);
}

/// Asserts queryname order with arrival-order ties, reading arrival from the `XI` tag.
pub fn assert_queryname_sorted(records: &[RecordBuf]) {
    assert_sorted_stable::<QuerynameKey, _>(records, arrival_index);
}

/// The `XI` integer tag test inputs use to record each record's input index.
pub fn arrival_index(record: &RecordBuf) -> usize {
    record
        .data()
        .get(&Tag::new(b'X', b'I'))
        .and_then(Value::as_int)
        .and_then(|v| usize::try_from(v).ok())
        .expect("XI tag")
}

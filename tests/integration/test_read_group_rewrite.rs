//! End-to-end read group rewriting through the library.

use std::fs;

use fgrg_lib::emitter::EmitMode;
use fgrg_lib::errors::RgError;
use fgrg_lib::header::declared_sort_order;
use fgrg_lib::sort::SortOrder;
use noodles::sam::alignment::record::data::field::Tag;
use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::{
    RecordBuilder, assert_all_rg, assert_single_read_group, create_two_reference_header, mapped,
    read_alignment_file, read_group, read_group_fields, record_names, rewrite_default,
    unplaced, with_read_groups, write_alignment_file,
};

/// Three coordinate-sorted records over two references, no order requested.
#[test]
fn test_three_records_keep_order_and_header() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    let header = create_two_reference_header(Some("coordinate"));
    let records = vec![mapped("a", 0, 100), mapped("b", 0, 200), mapped("c", 1, 50)];
    write_alignment_file(&input, &header, &records);

    let summary = rewrite_default(&input, &output, &read_group("rg1"), None).unwrap();
    assert_eq!(summary.mode, EmitMode::PassThrough);
    assert_eq!(summary.records_read, 3);
    assert_eq!(summary.records_written, 3);

    let (out_header, out_records) = read_alignment_file(&output);
    assert_eq!(declared_sort_order(&out_header), SortOrder::Coordinate);
    assert_eq!(out_header.reference_sequences(), header.reference_sequences());
    assert_single_read_group(&out_header, "rg1");
    assert_eq!(record_names(&out_records), vec!["a", "b", "c"]);
    assert_all_rg(&out_records, "rg1");
}

#[test]
fn test_rg_replaced_whatever_it_was() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    let header = with_read_groups(
        create_two_reference_header(Some("unsorted")),
        &[("old1", "s1"), ("old2", "s2"), ("new", "s3")],
    );
    let records = vec![
        RecordBuilder::new().name("absent").build(),
        RecordBuilder::new().name("different").tag("RG", "old1").build(),
        RecordBuilder::new().name("matching").tag("RG", "new").build(),
        RecordBuilder::new().name("other-tags").tag("RG", "old2").int_tag("NM", 3).build(),
    ];
    write_alignment_file(&input, &header, &records);

    rewrite_default(&input, &output, &read_group("new"), None).unwrap();

    let (out_header, out_records) = read_alignment_file(&output);
    assert_single_read_group(&out_header, "new");
    assert_all_rg(&out_records, "new");
    assert_eq!(record_names(&out_records), vec!["absent", "different", "matching", "other-tags"]);
    let nm = out_records[3].data().get(&Tag::EDIT_DISTANCE);
    assert_eq!(nm.and_then(|v| v.as_int()), Some(3));
}

/// Pass-through preserves arrival order, even when it contradicts the declared order.
#[rstest]
#[case::no_request(None)]
#[case::same_order_requested(Some(SortOrder::Coordinate))]
fn test_pass_through_preserves_arrival_order(#[case] requested: Option<SortOrder>) {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    let header = create_two_reference_header(Some("coordinate"));
    let records: Vec<_> = (0..50).rev().map(|i| mapped(&format!("r{i}"), i % 2, i + 1)).collect();
    write_alignment_file(&input, &header, &records);

    let summary = rewrite_default(&input, &output, &read_group("A"), requested).unwrap();
    assert_eq!(summary.mode, EmitMode::PassThrough);

    let (_, out_records) = read_alignment_file(&output);
    assert_eq!(record_names(&out_records), record_names(&records));
}

#[rstest]
#[case::bam("in.bam", "out.bam")]
#[case::sam_to_bam("in.sam", "out.bam")]
#[case::bam_to_sam("in.bam", "out.sam")]
fn test_empty_input(#[case] input_name: &str, #[case] output_name: &str) {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join(input_name);
    let output = tmp.path().join(output_name);
    write_alignment_file(&input, &create_two_reference_header(Some("queryname")), &[]);

    let summary = rewrite_default(&input, &output, &read_group("A"), None).unwrap();
    assert_eq!(summary.records_read, 0);
    assert_eq!(summary.records_written, 0);

    let (out_header, out_records) = read_alignment_file(&output);
    assert_single_read_group(&out_header, "A");
    assert_eq!(out_header.reference_sequences().len(), 2);
    assert!(out_records.is_empty());
}

#[rstest]
#[case::pass_through(None)]
#[case::reorder(Some(SortOrder::Coordinate))]
fn test_second_run_is_byte_identical(#[case] requested: Option<SortOrder>) {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let first = tmp.path().join("first.bam");
    let second = tmp.path().join("second.bam");
    let header = with_read_groups(create_two_reference_header(Some("queryname")), &[("x", "y")]);
    let mut records: Vec<_> = (0..200)
        .map(|i| {
            RecordBuilder::new()
                .name(&format!("q{i:04}"))
                .reference_sequence_id(i % 2)
                .alignment_start((i * 37) % 500 + 1)
                .tag("RG", "x")
                .build()
        })
        .collect();
    records.push(unplaced("zz-unplaced"));
    write_alignment_file(&input, &header, &records);

    let descriptor = read_group("A");
    rewrite_default(&input, &first, &descriptor, requested).unwrap();
    let summary = rewrite_default(&first, &second, &descriptor, requested).unwrap();
    assert_eq!(summary.mode, EmitMode::PassThrough);

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_optional_fields_in_header() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.sam");
    let output = tmp.path().join("out.sam");
    write_alignment_file(&input, &create_two_reference_header(None), &[mapped("a", 0, 1)]);

    let mut fields = read_group_fields("A");
    fields.sequencing_center = Some("Broad Institute".to_string());
    fields.run_date = Some("2024-03-01".to_string());
    fields.predicted_insert_size = Some(350);
    fields.platform_model = Some("NovaSeq 6000".to_string());
    rewrite_default(&input, &output, &fields.validate().unwrap(), None).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let rg_line = text.lines().find(|l| l.starts_with("@RG")).unwrap();
    assert!(rg_line.contains("ID:A"));
    assert!(rg_line.contains("CN:Broad Institute"));
    assert!(rg_line.contains("DT:2024-03-01"));
    assert!(rg_line.contains("PI:350"));
    assert!(rg_line.contains("PM:NovaSeq 6000"));
    assert_eq!(text.lines().filter(|l| l.starts_with("@RG")).count(), 1);
}

#[test]
fn test_validation_reports_every_bad_field() {
    let mut fields = read_group_fields("lib\none");
    fields.description = Some(String::new());
    fields.run_date = Some("not-a-date".to_string());

    let Err(RgError::InvalidTagValues { messages }) = fields.validate() else {
        panic!("expected InvalidTagValues");
    };
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().any(|m| m.starts_with("ID")));
    assert!(messages.iter().any(|m| m.starts_with("DS")));
    assert!(messages.iter().any(|m| m.starts_with("DT")));
}

//! Re-sorting to a requested order, in memory and through spilled runs.

use std::fs;

use fgrg_lib::emitter::EmitMode;
use fgrg_lib::header::declared_sort_order;
use fgrg_lib::sort::{SortOrder, SortedKind};
use noodles::sam::alignment::record_buf::RecordBuf;
use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::{
    RecordBuilder, arrival_index, assert_all_rg, assert_coordinate_sorted,
    assert_queryname_sorted, assert_single_read_group, create_two_reference_header, emit_options,
    read_alignment_file, read_group, rewrite, write_alignment_file,
};

/// `count` records in queryname order, scattered over two references with many duplicate
/// positions, some unplaced. Each carries its input index in `XI`.
fn queryname_ordered_records(count: usize) -> Vec<RecordBuf> {
    (0..count)
        .map(|i| {
            let builder = RecordBuilder::new()
                .name(&format!("read{i:08}"))
                .tag("RG", "old")
                .int_tag("XI", i32::try_from(i).unwrap());
            if i % 97 == 0 {
                builder.build()
            } else {
                builder
                    .reference_sequence_id((i * 7) % 2)
                    .alignment_start((i * 7919) % 5_000 + 1)
                    .build()
            }
        })
        .collect()
}

fn reorder_to_coordinate(count: usize, max_records_in_ram: usize, expected_runs: usize) {
    let tmp = TempDir::new().unwrap();
    let scratch = tmp.path().join("scratch");
    fs::create_dir(&scratch).unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    let records = queryname_ordered_records(count);
    write_alignment_file(&input, &create_two_reference_header(Some("queryname")), &records);

    let summary = rewrite(
        &input,
        &output,
        &read_group("A"),
        Some(SortOrder::Coordinate),
        emit_options(max_records_in_ram, Some(&scratch)),
    )
    .unwrap();
    assert_eq!(summary.mode, EmitMode::Reorder(SortOrder::Coordinate));
    assert_eq!(summary.runs_spilled, expected_runs);
    assert_eq!(summary.sorted_kind, Some(SortedKind::Merge));
    assert_eq!(summary.records_written, count as u64);

    let (header, out_records) = read_alignment_file(&output);
    assert_eq!(declared_sort_order(&header), SortOrder::Coordinate);
    assert_single_read_group(&header, "A");
    assert_eq!(out_records.len(), count);
    assert_coordinate_sorted(&out_records);
    assert_all_rg(&out_records, "A");
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0, "sort runs left behind");
}

#[test]
fn test_queryname_to_coordinate_with_four_runs() {
    reorder_to_coordinate(40_000, 10_000, 4);
}

#[test]
#[ignore = "slow: one million records"]
fn test_million_queryname_to_coordinate_with_four_runs() {
    reorder_to_coordinate(1_000_000, 250_000, 4);
}

#[test]
fn test_coordinate_to_queryname_is_stable_across_runs() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    // Five names repeated, so every key has many equal entries spread over several runs.
    let records: Vec<_> = (0..500)
        .map(|i| {
            RecordBuilder::new()
                .name(&format!("name{}", 4 - i % 5))
                .reference_sequence_id(0)
                .alignment_start(i + 1)
                .int_tag("XI", i32::try_from(i).unwrap())
                .build()
        })
        .collect();
    write_alignment_file(&input, &create_two_reference_header(Some("coordinate")), &records);

    let summary = rewrite(
        &input,
        &output,
        &read_group("A"),
        Some(SortOrder::Queryname),
        emit_options(64, Some(tmp.path())),
    )
    .unwrap();
    assert_eq!(summary.runs_spilled, 8);

    let (header, out_records) = read_alignment_file(&output);
    assert_eq!(declared_sort_order(&header), SortOrder::Queryname);
    assert_queryname_sorted(&out_records);
    let first: Vec<usize> = out_records.iter().take(3).map(arrival_index).collect();
    assert_eq!(first, vec![4, 9, 14]);
}

#[rstest]
#[case::fits_in_memory(100, 1_000, SortedKind::InMemory, 0)]
#[case::exactly_one_run(100, 100, SortedKind::SingleRun, 1)]
#[case::several_runs(100, 30, SortedKind::Merge, 4)]
fn test_finish_shapes(
    #[case] count: usize,
    #[case] budget: usize,
    #[case] kind: SortedKind,
    #[case] runs: usize,
) {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.sam");
    let output = tmp.path().join("out.sam");
    write_alignment_file(
        &input,
        &create_two_reference_header(Some("queryname")),
        &queryname_ordered_records(count),
    );

    let summary = rewrite(
        &input,
        &output,
        &read_group("A"),
        Some(SortOrder::Duplicate),
        emit_options(budget, Some(tmp.path())),
    )
    .unwrap();
    assert_eq!(summary.sorted_kind, Some(kind));
    assert_eq!(summary.runs_spilled, runs);

    let (header, out_records) = read_alignment_file(&output);
    assert_eq!(declared_sort_order(&header), SortOrder::Duplicate);
    assert_eq!(out_records.len(), count);
    assert_coordinate_sorted(&out_records);
}

#[test]
fn test_unknown_input_order_is_resorted() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    let mut records = queryname_ordered_records(50);
    records.reverse();
    write_alignment_file(&input, &create_two_reference_header(None), &records);

    let summary = rewrite(
        &input,
        &output,
        &read_group("A"),
        Some(SortOrder::Queryname),
        emit_options(1_000, None),
    )
    .unwrap();
    assert_eq!(summary.mode, EmitMode::Reorder(SortOrder::Queryname));

    let (_, out_records) = read_alignment_file(&output);
    assert_queryname_sorted(&out_records);
    assert_eq!(arrival_index(&out_records[0]), 0);
}

#[test]
fn test_requesting_unsorted_keeps_arrival_order() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    let records = queryname_ordered_records(20);
    write_alignment_file(&input, &create_two_reference_header(Some("coordinate")), &records);

    let summary = rewrite(
        &input,
        &output,
        &read_group("A"),
        Some(SortOrder::Unsorted),
        emit_options(5, None),
    )
    .unwrap();
    assert_eq!(summary.mode, EmitMode::PassThrough);
    assert_eq!(summary.runs_spilled, 0);

    let (header, out_records) = read_alignment_file(&output);
    assert_eq!(declared_sort_order(&header), SortOrder::Unsorted);
    let order: Vec<usize> = out_records.iter().map(arrival_index).collect();
    assert_eq!(order, (0..20).collect::<Vec<_>>());
}

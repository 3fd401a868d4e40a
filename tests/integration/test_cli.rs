//! Integration tests for the add-or-replace-read-groups command binary.

use std::path::Path;
use std::process::{Command, Output};

use fgrg_lib::header::declared_sort_order;
use fgrg_lib::sort::SortOrder;
use tempfile::TempDir;

use crate::helpers::{
    RecordBuilder, assert_all_rg, assert_coordinate_sorted, assert_single_read_group,
    create_two_reference_header, read_alignment_file, record_names, write_alignment_file,
};

fn run_fgrg(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fgrg")).args(args).output().expect("Failed to run fgrg")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn write_unsorted_input(path: &Path) {
    let records: Vec<_> = (0..30)
        .map(|i| {
            RecordBuilder::new()
                .name(&format!("r{i:02}"))
                .reference_sequence_id(i % 2)
                .alignment_start(100 - i)
                .int_tag("XI", i32::try_from(i).unwrap())
                .build()
        })
        .collect();
    write_alignment_file(path, &create_two_reference_header(Some("unsorted")), &records);
}

#[test]
fn test_cli_basic() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    write_unsorted_input(&input);

    let result = run_fgrg(&[
        "add-or-replace-read-groups",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--id",
        "grp",
        "--library",
        "lib1",
        "--platform",
        "ILLUMINA",
        "--platform-unit",
        "unit1",
        "--sample",
        "s1",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let (header, records) = read_alignment_file(&output);
    assert_single_read_group(&header, "grp");
    assert_eq!(declared_sort_order(&header), SortOrder::Unsorted);
    assert_eq!(records.len(), 30);
    assert_eq!(record_names(&records)[..3], ["r00", "r01", "r02"]);
    assert_all_rg(&records, "grp");
}

#[test]
fn test_cli_alias_and_sort_to_sam() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.sam");
    write_unsorted_input(&input);

    let result = run_fgrg(&[
        "replace-rg",
        "--input",
        path_str(&input),
        "--output",
        path_str(&output),
        "--RGLB",
        "lib1",
        "--RGPL",
        "ILLUMINA",
        "--RGPU",
        "unit1",
        "--RGSM",
        "s1",
        "--sort-order",
        "coordinate",
        "--max-records-in-ram",
        "7",
        "-T",
        path_str(tmp.path()),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let (header, records) = read_alignment_file(&output);
    assert_single_read_group(&header, "1");
    assert_eq!(declared_sort_order(&header), SortOrder::Coordinate);
    assert_eq!(records.len(), 30);
    assert_coordinate_sorted(&records);
    assert_all_rg(&records, "1");
}

#[test]
fn test_cli_invalid_values_create_no_output() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    let output = tmp.path().join("out.bam");
    write_unsorted_input(&input);

    let result = run_fgrg(&[
        "add-or-replace-read-groups",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--id",
        "lib\none",
        "--library",
        "lib1",
        "--platform",
        "ILLUMINA",
        "--platform-unit",
        "unit\u{7f}",
        "--sample",
        "s1",
    ]);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("ID must match"), "{stderr}");
    assert!(stderr.contains("PU must match"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn test_cli_missing_required_option() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.bam");
    write_unsorted_input(&input);

    let result = run_fgrg(&[
        "add-or-replace-read-groups",
        "-i",
        path_str(&input),
        "-o",
        path_str(&tmp.path().join("out.bam")),
        "--library",
        "lib1",
    ]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("--platform"));
}

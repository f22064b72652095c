//! Tests for the serialized range tree format and file merges.

use genorange::range_file::{file_and, file_or, RangeFile};
use genorange::{Error, GenomeRangeTree};
use std::fs;
use tempfile::tempdir;

fn sample_tree() -> GenomeRangeTree {
    let mut tree: GenomeRangeTree = GenomeRangeTree::new();
    for (chrom, start, end) in [
        ("chr10", 500, 900),
        ("chr2", 0, 100),
        ("chr2", 50, 150),
        ("chr1", 1000, 2000),
        ("chrX", 5, 6),
    ] {
        tree.add(chrom, start, end).unwrap();
    }
    tree
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_round_trip_preserves_ranges_and_coverage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mask.txt");

    let tree = sample_tree();
    let mut file = RangeFile::new(tree.clone());
    file.header.push("#baseMask from test".to_string());
    file.save(&path).unwrap();

    let back: RangeFile = RangeFile::load(&path).unwrap();
    assert_eq!(back.header, vec!["#baseMask from test".to_string()]);
    assert_eq!(back.tree.total_covered_length(), tree.total_covered_length());
    assert_eq!(back.tree.chromosomes(), tree.chromosomes());
    for chrom in tree.chromosomes() {
        assert_eq!(
            back.tree.find(chrom).unwrap().to_sorted_list(),
            tree.find(chrom).unwrap().to_sorted_list()
        );
    }
}

#[test]
fn test_output_in_natural_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mask.txt");
    RangeFile::new(sample_tree()).save(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "chr1\t1000\t2000\nchr2\t0\t150\nchr10\t500\t900\nchrX\t5\t6\n"
    );
}

// =============================================================================
// Or / and merges
// =============================================================================

#[test]
fn test_file_or_unions_and_keeps_headers() {
    let dir = tempdir().unwrap();
    let (a, b, out) = (
        dir.path().join("a.txt"),
        dir.path().join("b.txt"),
        dir.path().join("out.txt"),
    );
    fs::write(&a, "#source a\n#shared\nchr1\t0\t10\nchr1\t100\t110\n").unwrap();
    fs::write(&b, "#shared\n#source b\nchr1\t10\t20\nchr2\t0\t5\n").unwrap();

    let merged = file_or(&a, &b, &out).unwrap();
    assert_eq!(
        merged.header,
        vec!["#source a", "#shared", "#source b"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
    assert_eq!(merged.tree.total_covered_length(), 35);

    let content = fs::read_to_string(&out).unwrap();
    assert_eq!(
        content,
        "#source a\n#shared\n#source b\nchr1\t0\t20\nchr1\t100\t110\nchr2\t0\t5\n"
    );
}

#[test]
fn test_file_and_is_unimplemented() {
    let dir = tempdir().unwrap();
    let (a, b, out) = (
        dir.path().join("a.txt"),
        dir.path().join("b.txt"),
        dir.path().join("out.txt"),
    );
    fs::write(&a, "chr1\t0\t10\n").unwrap();
    fs::write(&b, "chr1\t5\t10\n").unwrap();

    assert!(matches!(file_and(&a, &b, &out), Err(Error::Unimplemented(_))));
    assert!(!out.exists());
}

#[test]
fn test_malformed_input_leaves_no_output() {
    let dir = tempdir().unwrap();
    let (a, b, out) = (
        dir.path().join("a.txt"),
        dir.path().join("b.txt"),
        dir.path().join("out.txt"),
    );
    fs::write(&a, "chr1\t0\t10\n").unwrap();
    fs::write(&b, "chr1\t0\t10\nchr1\tnot-a-number\t20\n").unwrap();

    assert!(matches!(
        file_or(&a, &b, &out),
        Err(Error::Parse { line: 2, .. })
    ));
    assert!(!out.exists());
}

#[test]
fn test_from_bed_then_save() {
    let dir = tempdir().unwrap();
    let bed = dir.path().join("peaks.bed");
    let out = dir.path().join("peaks.mask");
    fs::write(
        &bed,
        "track name=peaks\nchr1\t10\t20\tpeak1\t0\t+\nchr1\t15\t30\tpeak2\t0\t-\n",
    )
    .unwrap();

    let tree = GenomeRangeTree::from_bed_path(&bed).unwrap();
    RangeFile::new(tree).save(&out).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "chr1\t10\t30\n");
}

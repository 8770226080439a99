//! Descending scans return the reverse of the matching ascending scan.

use crate::e2e_tests::helpers::*;
use crate::types::{CmpOp, Record};

#[test]
fn test_descending_inclusive_range() {
    let db = sample_database();
    let rows = scan_all(
        &db,
        "T",
        range(CmpOp::Le, int_key("a", 4), CmpOp::Ge, int_key("a", 2)),
    );
    assert_eq!(ints(&rows, "a"), vec![4, 3, 2]);
}

#[test]
fn test_descending_exclusive_range() {
    let db = sample_database();
    let rows = scan_all(
        &db,
        "T",
        range(CmpOp::Lt, int_key("a", 4), CmpOp::Gt, int_key("a", 1)),
    );
    assert_eq!(ints(&rows, "a"), vec![3, 2]);
}

#[test]
fn test_descending_full_scan() {
    let db = sample_database();
    let rows = scan_all(&db, "T", range(CmpOp::Le, Record::new(), CmpOp::Ge, Record::new()));
    assert_eq!(ints(&rows, "a"), vec![5, 4, 3, 2, 1]);

    let index_rows = scan_all(
        &db,
        "T",
        range(CmpOp::Le, Record::new(), CmpOp::Ge, Record::new()).using_index("by_b"),
    );
    assert_eq!(ints(&index_rows, "b"), vec![5, 4, 3, 2, 1]);
}

#[test]
fn test_manual_stepping() {
    let db = sample_database();
    let mut scanner = db
        .scan(
            "T",
            range(CmpOp::Le, int_key("a", 3), CmpOp::Gt, int_key("a", 1)),
        )
        .expect("scan");

    let mut seen = Vec::new();
    let mut row = Record::new();
    while scanner.valid() {
        assert!(scanner.deref(&mut row).expect("deref"));
        seen.extend(ints(std::slice::from_ref(&row), "a"));
        scanner.next().expect("step");
    }
    assert_eq!(seen, vec![3, 2]);

    // Further steps are no-ops
    scanner.next().expect("step");
    assert!(!scanner.valid());
    assert!(!scanner.deref(&mut row).expect("deref"));
}

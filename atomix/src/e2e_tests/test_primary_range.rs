//! Ascending primary-key ranges over `T(a, b)`.

use crate::e2e_tests::helpers::*;
use crate::types::{CmpOp, Record};

#[test]
fn test_inclusive_range() {
    let db = sample_database();
    let rows = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, int_key("a", 2), CmpOp::Le, int_key("a", 4)),
    );
    assert_eq!(ints(&rows, "a"), vec![2, 3, 4]);
    assert_eq!(ints(&rows, "b"), vec![3, 1, 4]);
}

#[test]
fn test_exclusive_range() {
    let db = sample_database();
    let rows = scan_all(
        &db,
        "T",
        range(CmpOp::Gt, int_key("a", 2), CmpOp::Lt, int_key("a", 4)),
    );
    assert_eq!(ints(&rows, "a"), vec![3]);
}

#[test]
fn test_mixed_inclusivity() {
    let db = sample_database();
    let half_open = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, int_key("a", 2), CmpOp::Lt, int_key("a", 4)),
    );
    assert_eq!(ints(&half_open, "a"), vec![2, 3]);

    let other_half = scan_all(
        &db,
        "T",
        range(CmpOp::Gt, int_key("a", 2), CmpOp::Le, int_key("a", 4)),
    );
    assert_eq!(ints(&other_half, "a"), vec![3, 4]);
}

#[test]
fn test_bounds_outside_data() {
    let db = sample_database();
    let all = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, int_key("a", -100), CmpOp::Le, int_key("a", 100)),
    );
    assert_eq!(ints(&all, "a"), vec![1, 2, 3, 4, 5]);

    let above = scan_all(
        &db,
        "T",
        range(CmpOp::Gt, int_key("a", 5), CmpOp::Le, int_key("a", 100)),
    );
    assert!(above.is_empty());

    let inverted = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, int_key("a", 4), CmpOp::Le, int_key("a", 2)),
    );
    assert!(inverted.is_empty());
}

#[test]
fn test_unbounded_scan_stays_in_table() {
    // The catalog and the by_b index share the tree
    let db = sample_database();
    let rows = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()),
    );
    assert_eq!(ints(&rows, "a"), vec![1, 2, 3, 4, 5]);
}

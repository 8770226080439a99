//! Invalid scan requests fail at setup.

use crate::e2e_tests::helpers::*;
use crate::query::ScanError;
use crate::types::{CmpOp, Record, ValueType};

#[test]
fn test_same_direction_is_bad_range() {
    let db = sample_database();
    for (cmp1, cmp2) in [
        (CmpOp::Ge, CmpOp::Ge),
        (CmpOp::Gt, CmpOp::Ge),
        (CmpOp::Le, CmpOp::Lt),
    ] {
        let result = db.scan("T", range(cmp1, int_key("a", 1), cmp2, int_key("a", 4)));
        assert!(
            matches!(
                result,
                Err(ScanError::BadRange { start, end }) if start == cmp1 && end == cmp2
            ),
            "{cmp1}/{cmp2} was accepted"
        );
    }
}

#[test]
fn test_unknown_table() {
    let db = sample_database();
    let result = db.scan(
        "nope",
        range(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()),
    );
    assert!(matches!(result, Err(ScanError::TableNotFound(name)) if name == "nope"));
}

#[test]
fn test_unindexed_bounds() {
    let db = sample_database();

    let no_index = db.scan(
        "T",
        range(
            CmpOp::Ge,
            Record::new().add_int64("c", 1),
            CmpOp::Le,
            Record::new(),
        ),
    );
    assert!(matches!(no_index, Err(ScanError::UnindexedQuery { .. })));

    // The end bound must follow the key space the start bound picked
    let mismatched = db.scan(
        "T",
        range(CmpOp::Ge, int_key("a", 1), CmpOp::Le, int_key("b", 4)),
    );
    assert!(matches!(
        mismatched,
        Err(ScanError::UnindexedQuery { columns, .. }) if columns == vec!["b".to_string()]
    ));

    let missing_index = db.scan(
        "T",
        range(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()).using_index("by_c"),
    );
    assert!(matches!(
        missing_index,
        Err(ScanError::IndexNotFound { index, .. }) if index == "by_c"
    ));
}

#[test]
fn test_bound_type_mismatch() {
    let db = sample_database();
    let result = db.scan(
        "T",
        range(
            CmpOp::Ge,
            Record::new().add_str("a", "1"),
            CmpOp::Le,
            Record::new(),
        ),
    );
    assert!(matches!(
        result,
        Err(ScanError::TypeMismatch {
            expected: ValueType::Int64,
            actual: ValueType::Bytes,
            ..
        })
    ));
}

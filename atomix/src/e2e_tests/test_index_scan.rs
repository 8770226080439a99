//! Secondary index scans resolve entries back to full rows.

use crate::e2e_tests::helpers::*;
use crate::query::IndexSelection;
use crate::types::{CmpOp, Record, TableDef, ValueType};

#[test]
fn test_unbounded_index_scan_orders_by_indexed_column() {
    let db = sample_database();
    let rows = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()).using_index("by_b"),
    );
    assert_eq!(ints(&rows, "a"), vec![3, 5, 2, 4, 1]);
    assert_eq!(ints(&rows, "b"), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_bound_columns_select_index() {
    let db = sample_database();
    let scanner = db
        .scan(
            "T",
            range(CmpOp::Gt, int_key("b", 1), CmpOp::Le, int_key("b", 3)),
        )
        .expect("scan");
    assert_eq!(scanner.layout().selection, IndexSelection::Secondary(0));

    let rows: Vec<Record> = scanner.rows().collect::<Result<_, _>>().expect("rows");
    assert_eq!(ints(&rows, "a"), vec![5, 2]);
}

#[test]
fn test_index_rows_match_primary_rows() {
    let db = sample_database();
    let mut by_index = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, int_key("b", 2), CmpOp::Le, int_key("b", 4)),
    );
    let by_primary = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()),
    );

    by_index.sort_by_key(|r| ints(std::slice::from_ref(r), "a"));
    let expected: Vec<Record> = by_primary
        .into_iter()
        .filter(|r| ints(std::slice::from_ref(r), "b").iter().all(|b| (2..=4).contains(b)))
        .collect();
    assert_eq!(by_index, expected);
}

#[test]
fn test_duplicate_index_values() {
    let table = TableDef::builder("orders")
        .column("id", ValueType::Int64)
        .column("customer", ValueType::Int64)
        .column("note", ValueType::Bytes)
        .index("by_customer", &["customer"])
        .build()
        .expect("valid table");
    let rows = [(10, 7), (11, 3), (12, 7), (13, 7), (14, 3)]
        .into_iter()
        .map(|(id, customer)| {
            (
                "orders",
                Record::new()
                    .add_int64("id", id)
                    .add_int64("customer", customer)
                    .add_str("note", "n"),
            )
        })
        .collect();
    let db = memory_database(vec![table], rows);

    let sevens = scan_all(
        &db,
        "orders",
        range(
            CmpOp::Ge,
            int_key("customer", 7),
            CmpOp::Le,
            int_key("customer", 7),
        ),
    );
    // Ties break on the primary key carried in the index
    assert_eq!(ints(&sevens, "id"), vec![10, 12, 13]);

    let reversed = scan_all(
        &db,
        "orders",
        range(
            CmpOp::Le,
            int_key("customer", 7),
            CmpOp::Ge,
            int_key("customer", 3),
        ),
    );
    assert_eq!(ints(&reversed, "id"), vec![13, 12, 10, 14, 11]);
}

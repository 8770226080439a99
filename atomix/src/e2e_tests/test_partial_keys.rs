//! Bounds over a leading subset of a composite key.

use crate::e2e_tests::helpers::*;
use crate::database::Database;
use crate::storage::MemoryStore;
use crate::types::{CmpOp, Record, TableDef, Value, ValueType};

fn events_database() -> Database<MemoryStore> {
    let table = TableDef::builder("events")
        .column("region", ValueType::Bytes)
        .column("seq", ValueType::Int64)
        .column("kind", ValueType::Int64)
        .primary_key(2)
        .index("by_kind", &["kind"])
        .build()
        .expect("valid table");

    let mut rows = Vec::new();
    for (region, seqs) in [
        ("ap", &[1, 2][..]),
        ("eu", &[i64::MIN, -5, 0, 9, i64::MAX][..]),
        ("eu-west", &[3][..]),
        ("us", &[4, 8][..]),
    ] {
        for &seq in seqs {
            rows.push((
                "events",
                Record::new()
                    .add_str("region", region)
                    .add_int64("seq", seq)
                    .add_int64("kind", seq.rem_euclid(3)),
            ));
        }
    }
    memory_database(vec![table], rows)
}

fn region(name: &str) -> Record {
    Record::new().add_str("region", name)
}

fn keys(rows: &[Record]) -> Vec<(String, i64)> {
    rows.iter()
        .map(|r| {
            let region = r
                .get("region")
                .and_then(Value::as_bytes)
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            (region, ints(std::slice::from_ref(r), "seq")[0])
        })
        .collect()
}

fn eu(seqs: &[i64]) -> Vec<(String, i64)> {
    seqs.iter().map(|&s| ("eu".to_string(), s)).collect()
}

#[test]
fn test_prefix_equality() {
    let db = events_database();
    let rows = scan_all(&db, "events", range(CmpOp::Ge, region("eu"), CmpOp::Le, region("eu")));
    assert_eq!(keys(&rows), eu(&[i64::MIN, -5, 0, 9, i64::MAX]));

    let rows = scan_all(&db, "events", range(CmpOp::Le, region("eu"), CmpOp::Ge, region("eu")));
    assert_eq!(keys(&rows), eu(&[i64::MAX, 9, 0, -5, i64::MIN]));
}

#[test]
fn test_exclusive_prefix_bounds() {
    let db = events_database();

    // Strictly after every "eu" key, but "eu-west" sorts after "eu"
    let after = scan_all(&db, "events", range(CmpOp::Gt, region("eu"), CmpOp::Lt, region("us")));
    assert_eq!(keys(&after), vec![("eu-west".to_string(), 3)]);

    let before = scan_all(&db, "events", range(CmpOp::Lt, region("eu"), CmpOp::Ge, region("ap")));
    assert_eq!(
        keys(&before),
        vec![("ap".to_string(), 2), ("ap".to_string(), 1)]
    );
}

#[test]
fn test_full_and_partial_bounds_mixed() {
    let db = events_database();
    let start = region("eu").add_int64("seq", -5);
    let rows = scan_all(&db, "events", range(CmpOp::Gt, start, CmpOp::Le, region("eu")));
    assert_eq!(keys(&rows), eu(&[0, 9, i64::MAX]));

    let start = region("eu").add_int64("seq", 9);
    let rows = scan_all(&db, "events", range(CmpOp::Lt, start, CmpOp::Ge, region("eu")));
    assert_eq!(keys(&rows), eu(&[0, -5, i64::MIN]));
}

#[test]
fn test_partial_bound_on_secondary_index() {
    let db = events_database();
    // kind is seq mod 3, so kind 0 holds the rows with seq 0, 9 and 3
    let kind = |k| Record::new().add_int64("kind", k);
    let rows = scan_all(&db, "events", range(CmpOp::Ge, kind(0), CmpOp::Le, kind(0)));
    let mut found = keys(&rows);
    found.sort();
    assert_eq!(
        found,
        vec![
            ("eu".to_string(), 0),
            ("eu".to_string(), 9),
            ("eu-west".to_string(), 3),
        ]
    );
}

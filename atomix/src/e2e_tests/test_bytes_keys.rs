//! Byte-string keys sort by their raw bytes, including escaped bytes.

use crate::e2e_tests::helpers::*;
use crate::types::{CmpOp, Record, TableDef, Value, ValueType};

const NAMES: [&[u8]; 12] = [
    b"",
    b"\x00",
    b"\x00\x00",
    b"\x00\x01",
    b"\x01",
    b"a",
    b"a\x00",
    b"a\x00b",
    b"a\xfe",
    b"a\xff",
    b"\xfe",
    b"\xff\xff",
];

fn name(bytes: &[u8]) -> Record {
    Record::new().add_bytes("name", bytes)
}

fn names(rows: &[Record]) -> Vec<Vec<u8>> {
    rows.iter()
        .filter_map(|r| r.get("name").and_then(Value::as_bytes).map(<[u8]>::to_vec))
        .collect()
}

#[test]
fn test_bytes_keys_scan_in_byte_order() {
    let table = TableDef::builder("files")
        .column("name", ValueType::Bytes)
        .column("size", ValueType::Int64)
        .build()
        .expect("valid table");
    // Insert in reverse so order comes from the keys
    let rows = NAMES
        .iter()
        .rev()
        .zip(0..)
        .map(|(n, size)| ("files", name(n).add_int64("size", size)))
        .collect();
    let db = memory_database(vec![table], rows);

    let mut sorted: Vec<Vec<u8>> = NAMES.iter().map(|n| n.to_vec()).collect();
    sorted.sort();
    assert_eq!(sorted, NAMES.iter().map(|n| n.to_vec()).collect::<Vec<_>>());

    let all = scan_all(&db, "files", range(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()));
    assert_eq!(names(&all), sorted);

    let a_prefixed = scan_all(
        &db,
        "files",
        range(CmpOp::Ge, name(b"a"), CmpOp::Lt, name(b"b")),
    );
    assert_eq!(
        names(&a_prefixed),
        vec![
            b"a".to_vec(),
            b"a\x00".to_vec(),
            b"a\x00b".to_vec(),
            b"a\xfe".to_vec(),
            b"a\xff".to_vec(),
        ]
    );

    let high = scan_all(
        &db,
        "files",
        range(CmpOp::Le, Record::new(), CmpOp::Gt, name(b"a\xff")),
    );
    assert_eq!(names(&high), vec![b"\xff\xff".to_vec(), b"\xfe".to_vec()]);

    let nul = scan_all(
        &db,
        "files",
        range(CmpOp::Gt, name(b""), CmpOp::Le, name(b"\x00\x01")),
    );
    assert_eq!(
        names(&nul),
        vec![b"\x00".to_vec(), b"\x00\x00".to_vec(), b"\x00\x01".to_vec()]
    );
}

#[test]
fn test_negative_integers_order() {
    let table = TableDef::builder("points")
        .column("x", ValueType::Int64)
        .build()
        .expect("valid table");
    let xs = [0, i64::MIN, -1, 1, i64::MAX, -256, 255];
    let rows = xs
        .iter()
        .map(|&x| ("points", int_key("x", x)))
        .collect();
    let db = memory_database(vec![table], rows);

    let rows = scan_all(
        &db,
        "points",
        range(CmpOp::Gt, int_key("x", i64::MIN), CmpOp::Lt, int_key("x", i64::MAX)),
    );
    assert_eq!(ints(&rows, "x"), vec![-256, -1, 0, 1, 255]);
}

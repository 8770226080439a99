//! Scans over a page file survive a reopen and detect corruption.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::tempdir;

use crate::catalog::CatalogError;
use crate::config::EngineConfig;
use crate::database::{Database, DatabaseError};
use crate::e2e_tests::helpers::*;
use crate::storage::{PAGE_SIZE_U64, StoreError};
use crate::testing::{init_tracing, sample_rows, sample_table};
use crate::types::{CmpOp, Record};

fn small_fanout() -> EngineConfig {
    EngineConfig {
        max_node_keys: 2,
        ..EngineConfig::default()
    }
}

/// Invert the byte at `offset` within every node page (pages `1..total_pages`).
#[allow(clippy::expect_used)]
fn flip_node_bytes(path: &Path, total_pages: u64, offset: u64) {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .expect("open raw");
    for page in 1..total_pages {
        let at = page * PAGE_SIZE_U64 + offset;
        let mut byte = [0u8; 1];
        file.seek(SeekFrom::Start(at)).expect("seek");
        file.read_exact(&mut byte).expect("read");
        file.seek(SeekFrom::Start(at)).expect("seek");
        file.write_all(&[byte[0] ^ 0xFF]).expect("write");
    }
    file.sync_all().expect("sync");
}

#[test]
fn test_reopened_file_scans_identically() {
    init_tracing();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("scan.db");

    let requests = [
        range(CmpOp::Ge, int_key("a", 2), CmpOp::Le, int_key("a", 4)),
        range(CmpOp::Le, int_key("a", 4), CmpOp::Ge, int_key("a", 2)),
        range(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()).using_index("by_b"),
    ];

    let before: Vec<Vec<Record>> = {
        let db = Database::create(&path, small_fanout(), vec![sample_table()], sample_rows())
            .expect("create");
        requests
            .iter()
            .map(|r| scan_all(&db, "T", r.clone()))
            .collect()
    };

    let db = Database::open(&path, small_fanout()).expect("open");
    assert_eq!(db.table_names(), vec!["T"]);
    assert_eq!(db.store().root(), db.root());
    for (request, expected) in requests.iter().zip(&before) {
        assert_eq!(&scan_all(&db, "T", request.clone()), expected);
    }
    assert_eq!(ints(&before[2], "a"), vec![3, 5, 2, 4, 1]);
}

#[test]
fn test_corrupted_pages_fail_checksum() {
    init_tracing();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("corrupt.db");

    let total_pages = {
        let db = Database::create(&path, small_fanout(), vec![sample_table()], sample_rows())
            .expect("create");
        db.store().total_pages()
    };
    assert!(total_pages > 2);

    flip_node_bytes(&path, total_pages, PAGE_SIZE_U64 / 2);

    let result = Database::open(&path, small_fanout());
    assert!(
        matches!(
            result,
            Err(DatabaseError::Catalog(CatalogError::Store(
                StoreError::ChecksumMismatch { .. }
            )))
        ),
        "unexpected result: {result:?}"
    );
}

#[test]
fn test_unverified_open_ignores_checksums() {
    init_tracing();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("unverified.db");

    let total_pages = {
        let db = Database::create(&path, small_fanout(), vec![sample_table()], sample_rows())
            .expect("create");
        db.store().total_pages()
    };
    assert!(total_pages > 2);

    // Small nodes never reach the end of their page, so only the checksum breaks
    flip_node_bytes(&path, total_pages, PAGE_SIZE_U64 - 1);

    let unverified = EngineConfig {
        verify_checksums: false,
        ..small_fanout()
    };
    let db = Database::open(&path, unverified).expect("open without verification");
    let rows = scan_all(
        &db,
        "T",
        range(CmpOp::Ge, int_key("a", 2), CmpOp::Le, int_key("a", 4)),
    );
    assert_eq!(ints(&rows, "a"), vec![2, 3, 4]);
    assert_eq!(ints(&rows, "b"), vec![3, 1, 4]);
    drop(db);

    let result = Database::open(&path, small_fanout());
    assert!(
        matches!(
            result,
            Err(DatabaseError::Catalog(CatalogError::Store(
                StoreError::ChecksumMismatch { .. }
            )))
        ),
        "unexpected result: {result:?}"
    );
}

#[test]
fn test_create_refuses_existing_file() {
    init_tracing();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("twice.db");

    Database::create(&path, small_fanout(), vec![sample_table()], sample_rows()).expect("create");
    assert!(matches!(
        Database::create(&path, small_fanout(), vec![sample_table()], sample_rows()),
        Err(DatabaseError::Store(StoreError::AlreadyExists(_)))
    ));
}

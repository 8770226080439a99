//! Common helpers for end-to-end tests.

use crate::config::EngineConfig;
use crate::database::Database;
use crate::query::ScanRequest;
use crate::storage::{MemoryStore, NodeStore};
use crate::testing::{init_tracing, sample_rows, sample_table};
use crate::types::{CmpOp, Record, TableDef, Value};

/// Build an in-memory database with a small fanout so trees are several
/// levels deep even for a handful of rows.
#[allow(clippy::expect_used)]
pub fn memory_database(tables: Vec<TableDef>, rows: Vec<(&str, Record)>) -> Database<MemoryStore> {
    init_tracing();
    let config = EngineConfig {
        max_node_keys: 3,
        ..EngineConfig::default()
    };
    Database::build(MemoryStore::new(), config, tables, rows).expect("Failed to build database")
}

/// The `T(a, b)` database with rows `a = 1..=5`, `b = 5, 3, 1, 4, 2`.
pub fn sample_database() -> Database<MemoryStore> {
    memory_database(vec![sample_table()], sample_rows())
}

/// A single-column integer bound.
#[must_use]
pub fn int_key(column: &str, value: i64) -> Record {
    Record::new().add_int64(column, value)
}

#[must_use]
pub fn range(cmp1: CmpOp, key1: Record, cmp2: CmpOp, key2: Record) -> ScanRequest {
    ScanRequest::new(cmp1, key1, cmp2, key2)
}

/// Run a scan to completion.
#[allow(clippy::expect_used)]
pub fn scan_all<S: NodeStore>(db: &Database<S>, table: &str, request: ScanRequest) -> Vec<Record> {
    db.scan(table, request)
        .expect("Failed to start scan")
        .rows()
        .collect::<Result<Vec<_>, _>>()
        .expect("Scan failed")
}

/// The integer values of `column` across `rows`.
#[must_use]
pub fn ints(rows: &[Record], column: &str) -> Vec<i64> {
    rows.iter()
        .filter_map(|r| r.get(column).and_then(Value::as_int64))
        .collect()
}

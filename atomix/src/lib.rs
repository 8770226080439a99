// Life of a scan:
// 1. Look up the table definition in the catalog
// 2. Pick the key space: primary key, or a secondary index whose leading
//    columns match the bounds
// 3. Encode both bounds into byte keys, padding partial bounds
// 4. Seek a B+tree cursor to the start key
// 5. Step while the key stays inside both bounds
//     - Primary key: decode the row from the entry
//     - Secondary index: decode the primary key, then point-get the row
//
// System components:
//  - Order-preserving key codec
//  - Immutable B+tree pages behind a read-only node store
//  - Bulk loader that materializes tables and indexes
//  - Scanner over the cursor

pub mod catalog;
pub mod codec;
pub mod config;
pub mod database;
pub mod query;
pub mod storage;
pub mod types;

mod e2e_tests;
#[cfg(test)]
mod testing;

pub use config::{EngineConfig, IndexMissPolicy};
pub use database::{Database, DatabaseError};
pub use query::{ScanError, ScanRequest, Scanner};
pub use types::{CmpOp, Record, TableDef, Value, ValueType};
